//! Fixed infrastructure modules served verbatim.
//!
//! Every assembled component imports these two modules: the normalizer
//! that merges script, render functions and style hooks into one component
//! object, and the hot-update runtime that keeps live component instances
//! in sync across edits.

/// ES module exporting `normalizeComponent` as its default export.
pub const NORMALIZER_RUNTIME: &str = r#"/* vue component normalizer */
export default function normalizeComponent (
  scriptExports,
  render,
  staticRenderFns,
  functionalTemplate,
  injectStyles,
  scopeId,
  moduleIdentifier,
  shadowMode
) {
  var options = typeof scriptExports === 'function'
    ? scriptExports.options
    : scriptExports

  if (render) {
    options.render = render
    options.staticRenderFns = staticRenderFns
    options._compiled = true
  }

  if (functionalTemplate) {
    options.functional = true
  }

  if (scopeId) {
    options._scopeId = 'data-v-' + scopeId
  }

  var hook
  if (injectStyles) {
    hook = shadowMode
      ? function () { injectStyles.call(this, this.$root.$options.shadowRoot) }
      : injectStyles
  }

  if (hook) {
    if (options.functional) {
      options._injectStyles = hook
      var originalRender = options.render
      options.render = function renderWithStyleInjection (h, context) {
        hook.call(context)
        return originalRender(h, context)
      }
    } else {
      var existing = options.beforeCreate
      options.beforeCreate = existing ? [].concat(existing, hook) : [hook]
    }
  }

  return {
    exports: scriptExports,
    options: options
  }
}
"#;

/// ES module exporting the hot-update API (`install`, `compatible`,
/// `isRecorded`, `createRecord`, `rerender`, `reload`).
pub const HOT_RELOAD_RUNTIME: &str = r#"/* vue hot reload runtime */
var Vue
var map = Object.create(null)
if (typeof window !== 'undefined') {
  window.__VUE_HOT_MAP__ = map
}
var installed = false
var initHookName = 'beforeCreate'

var api = {
  compatible: false,

  install: function (vue) {
    if (installed) return
    installed = true
    Vue = vue.__esModule ? vue.default : vue
    var version = Vue.version.split('.').map(Number)
    api.compatible = version[0] >= 2
    if (!api.compatible) {
      console.warn('[HMR] You are using a version of vue-hot-reload-api that is only compatible with Vue.js core ^2.0.0.')
    }
  },

  isRecorded: function (id) {
    return typeof map[id] !== 'undefined'
  },

  createRecord: function (id, options) {
    if (map[id]) return
    var Ctor = null
    if (typeof options === 'function') {
      Ctor = options
      options = Ctor.options
    }
    makeOptionsHot(id, options)
    map[id] = { Ctor: Ctor, options: options, instances: [] }
  },

  rerender: tryWrap(function (id, options) {
    var record = map[id]
    if (!options) {
      record.instances.slice().forEach(function (instance) {
        instance.$forceUpdate()
      })
      return
    }
    if (typeof options === 'function') {
      options = options.options
    }
    if (record.Ctor) {
      record.Ctor.options.render = options.render
      record.Ctor.options.staticRenderFns = options.staticRenderFns
      record.instances.slice().forEach(function (instance) {
        instance.$options.render = options.render
        instance.$options.staticRenderFns = options.staticRenderFns
        if (instance._staticTrees) instance._staticTrees = []
        instance.$forceUpdate()
      })
    } else {
      record.options.render = options.render
      record.options.staticRenderFns = options.staticRenderFns
      if (record.options.functional) {
        record.options._Ctor = null
      }
    }
  }),

  reload: tryWrap(function (id, options) {
    var record = map[id]
    if (options) {
      if (typeof options === 'function') {
        options = options.options
      }
      makeOptionsHot(id, options)
      if (record.Ctor) {
        var newCtor = record.Ctor.super.extend(options)
        newCtor.options._Ctor = record.options._Ctor
        record.Ctor.options = newCtor.options
        record.Ctor.cid = newCtor.cid
        record.Ctor.prototype = newCtor.prototype
        if (newCtor.release) newCtor.release()
      } else {
        Object.assign(record.options, options)
      }
    }
    record.instances.slice().forEach(function (instance) {
      if (instance.$vnode && instance.$vnode.context) {
        instance.$vnode.context.$forceUpdate()
      } else {
        console.warn('Root or manually mounted instance modified. Full reload required.')
      }
    })
  })
}

function makeOptionsHot (id, options) {
  if (options.functional) {
    var render = options.render
    options.render = function (h, ctx) {
      var instances = map[id].instances
      if (ctx && instances.indexOf(ctx.parent) < 0) {
        instances.push(ctx.parent)
      }
      return render(h, ctx)
    }
  } else {
    injectHook(options, initHookName, function () {
      var record = map[id]
      if (!record.Ctor) {
        record.Ctor = this.constructor
      }
      record.instances.push(this)
    })
    injectHook(options, 'beforeDestroy', function () {
      var instances = map[id].instances
      instances.splice(instances.indexOf(this), 1)
    })
  }
}

function injectHook (options, name, hook) {
  var existing = options[name]
  options[name] = existing
    ? Array.isArray(existing) ? existing.concat(hook) : [existing, hook]
    : [hook]
}

function tryWrap (fn) {
  return function (id, arg) {
    try {
      fn(id, arg)
    } catch (e) {
      console.error(e)
      console.warn('Something went wrong during Vue component hot-reload. Full reload required.')
    }
  }
}

export default api
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizer_has_default_export() {
        assert!(NORMALIZER_RUNTIME.contains("export default function normalizeComponent"));
        assert!(NORMALIZER_RUNTIME.contains("'data-v-' + scopeId"));
    }

    #[test]
    fn hot_runtime_guards_record_creation() {
        assert!(HOT_RELOAD_RUNTIME.contains("createRecord: function (id, options) {\n    if (map[id]) return"));
        assert!(HOT_RELOAD_RUNTIME.contains("export default api"));
    }
}

//! Script-visible timer API.
//!
//! Installs `createTimer(periodMillis, oneShot, callback)`, `deleteTimer(id)`
//! and `millis()` as globals, then evaluates the JS prelude that builds
//! `setTimeout` and friends on top of them.
//!
//! Callbacks are kept alive as [`Persistent`] functions inside the registry.
//! The bindings only ever run on the host thread, inside a context borrow.

use crate::ffi::ScriptHandle;
use kite_core::timer::{Reload, TimerRegistry};
use rquickjs::{Ctx, Exception, Function, Persistent};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Callback stored per timer.
pub type JsCallback = Persistent<Function<'static>>;

/// Registry shared between the host loop and the JS bindings.
pub type SharedTimers = Rc<RefCell<TimerRegistry<JsCallback>>>;

const PRELUDE: &str = include_str!("prelude/timers.js");

/// Register the timer globals on `ctx` and load the prelude.
pub fn install<'js>(ctx: &Ctx<'js>, timers: &SharedTimers) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let registry = Rc::clone(timers);
    let create_timer = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, period: f64, one_shot: bool, callback: Function<'js>| -> rquickjs::Result<f64> {
            if !period.is_finite() || period < 0.0 {
                return Err(Exception::throw_range(
                    &ctx,
                    "timer period must be a non-negative number of milliseconds",
                ));
            }
            let callback = Persistent::save(&ctx, callback);
            let id = registry
                .borrow_mut()
                .create(period.trunc() as u64, Reload::from_one_shot(one_shot), callback)
                .map_err(|err| Exception::throw_range(&ctx, &err.to_string()))?;
            trace!(timer = %id, "createTimer");
            Ok(ScriptHandle::from(id).to_js())
        },
    )?;
    globals.set("createTimer", create_timer)?;

    let registry = Rc::clone(timers);
    let delete_timer = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, id: f64| -> rquickjs::Result<()> {
            let handle = ScriptHandle::from_js(id)
                .ok_or_else(|| Exception::throw_type(&ctx, "timer id must be a non-negative integer"))?;
            registry.borrow_mut().delete(handle.into());
            Ok(())
        },
    )?;
    globals.set("deleteTimer", delete_timer)?;

    let registry = Rc::clone(timers);
    let millis = Function::new(ctx.clone(), move || registry.borrow().millis() as f64)?;
    globals.set("millis", millis)?;

    ctx.eval::<(), _>(PRELUDE)
}

use crate::context;

/// Run `body` with the calling thread withdrawn from work recruitment.
///
/// Any pool admission scope entered inside `body`, directly or further down
/// the call stack, treats the calling thread as unavailable, whatever that
/// pool's `admits_calling_thread` says. Submissions still reach the pool; a
/// [`TaskGroup::join`](crate::TaskGroup::join) inside simply blocks instead
/// of stealing.
pub fn isolate<F, R>(body: F) -> R
where
    F: FnOnce() -> R,
{
    let _isolation = context::enter_isolation();
    body()
}

pub fn is_isolated() -> bool {
    context::is_isolated()
}

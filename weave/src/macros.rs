/// Creates a single text [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use weave::{Role, wv_msg};
///
/// let message = wv_msg!(model => "Done.");
/// assert_eq!(message.role, Role::Model);
/// assert_eq!(message.text(), "Done.");
/// ```
#[macro_export]
macro_rules! wv_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::system($content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::user($content)
    };
    (model => $content:expr $(,)?) => {
        $crate::Message::model($content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::model($content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, model, or assistant");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use weave::{Role, wv_messages};
///
/// let messages = wv_messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! wv_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::wv_msg!($role => $content)),+]
    };
}

/// Creates a [`RunRequest`](crate::RunRequest) for a session and prompt, with
/// an optional system instruction.
///
/// ```rust
/// use weave::wv_run;
///
/// let request = wv_run!("session-1", "What changed?", "Be concise.");
/// assert_eq!(request.session_id.as_str(), "session-1");
/// assert_eq!(request.history.len(), 1);
/// ```
#[macro_export]
macro_rules! wv_run {
    ($session_id:expr, $prompt:expr $(,)?) => {
        $crate::RunRequest::new($session_id).with_prompt($prompt)
    };
    ($session_id:expr, $prompt:expr, $system_prompt:expr $(,)?) => {
        $crate::RunRequest::new($session_id)
            .with_history(vec![$crate::Message::system($system_prompt)])
            .with_prompt($prompt)
    };
}

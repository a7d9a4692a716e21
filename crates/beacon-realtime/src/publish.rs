//! `publish_realtime` — event construction and room resolution.
//!
//! Application code calls [`publish_realtime`] with whatever it knows (an
//! event name, a message, a user, a document, a task id) and the resolution
//! rules here derive the room. Deferred publishes land in the caller's
//! [`RealtimeOutbox`]; everything else is emitted immediately.

use serde_json::json;
use tracing::debug;

use beacon_core::rooms;
use beacon_core::{Envelope, Message, SiteContext};

use crate::outbox::RealtimeOutbox;
use crate::publisher::Publisher;

/// Arguments to [`publish_realtime`]. Everything is optional; unset fields
/// are resolved from the context and the rules below.
#[derive(Debug, Clone, Default)]
pub struct PublishArgs {
    /// Event name handled by the client. Defaults to `"task_progress"` inside
    /// a task context, `"global"` otherwise.
    pub event: Option<String>,
    /// JSON message body.
    pub message: Option<Message>,
    /// Explicit room; when set, no resolution happens.
    pub room: Option<String>,
    /// Transmit to a specific user.
    pub user: Option<String>,
    /// Transmit to a doctype (with `docname`, to a single document).
    pub doctype: Option<String>,
    /// Transmit to a single document of `doctype`.
    pub docname: Option<String>,
    /// Address a specific task's progress room.
    pub task_id: Option<String>,
    /// Defer emission until the surrounding transaction commits.
    pub after_commit: bool,
}

impl PublishArgs {
    /// Start from an event name.
    pub fn event(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::default()
        }
    }

    /// Set the message body.
    pub fn message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    /// Set an explicit room.
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Address a specific user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Address a doctype.
    pub fn doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    /// Address a document of the doctype.
    pub fn docname(mut self, docname: impl Into<String>) -> Self {
        self.docname = Some(docname.into());
        self
    }

    /// Address a task's progress room.
    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Defer emission until after commit.
    pub fn after_commit(mut self, after_commit: bool) -> Self {
        self.after_commit = after_commit;
        self
    }
}

/// Publish a realtime update.
///
/// Room resolution, first match wins:
/// 1. explicit `room`;
/// 2. `list_update` → doctype room, `docinfo_update` → doc room;
/// 3. a task id (explicit or ambient) → task progress room, with the task id
///    injected into the message and deferral forced off (progress must be
///    visible immediately, never buffered behind a commit);
/// 4. `user` → user room;
/// 5. `doctype` + `docname` → doc room;
/// 6. otherwise the site-wide broadcast room.
///
/// With `after_commit`, the envelope is appended to `outbox` (identical
/// triples queued once) instead of being emitted.
pub async fn publish_realtime(
    ctx: &SiteContext,
    publisher: &Publisher,
    outbox: &mut RealtimeOutbox,
    args: PublishArgs,
) {
    let PublishArgs {
        event,
        message,
        mut room,
        mut user,
        doctype,
        docname,
        task_id,
        mut after_commit,
    } = args;

    let mut message = message.unwrap_or_default();

    let event = match event {
        Some(e) => e,
        None if ctx.task_id().is_some() => "task_progress".to_string(),
        None => "global".to_string(),
    };

    if event == "msgprint" && user.is_none() {
        user = ctx.user().map(str::to_string);
    } else if event == "list_update" && room.is_none() {
        let doctype = doctype
            .clone()
            .or_else(|| message.get("doctype").and_then(|v| v.as_str()).map(str::to_string));
        room = Some(rooms::doctype_room(
            ctx.site(),
            doctype.as_deref().unwrap_or_default(),
        ));
    } else if event == "docinfo_update" && room.is_none() {
        room = Some(rooms::doc_room(
            ctx.site(),
            doctype.as_deref().unwrap_or_default(),
            docname.as_deref().unwrap_or_default(),
        ));
    }

    let task_id = task_id.or_else(|| ctx.task_id().map(str::to_string));

    let room = match room {
        Some(room) => room,
        None => {
            if let Some(task_id) = task_id.as_deref() {
                // Progress must reach subscribers right away.
                after_commit = false;
                if !message.contains_key("task_id") {
                    message.insert("task_id".to_string(), json!(task_id));
                }
                rooms::task_progress_room(ctx.site(), task_id)
            } else if let Some(user) = user.as_deref() {
                rooms::user_room(ctx.site(), user)
            } else if let (Some(doctype), Some(docname)) = (doctype.as_deref(), docname.as_deref())
            {
                rooms::doc_room(ctx.site(), doctype, docname)
            } else {
                rooms::site_room(ctx.site())
            }
        }
    };

    let envelope = Envelope::new(event, message, room);
    if after_commit {
        outbox.append(envelope);
    } else {
        publisher.emit(&envelope).await;
    }
}

/// Publish a `"progress"` update for the session user.
///
/// Convenience wrapper used by long-running operations to drive progress
/// bars; `percent` is 0–100.
pub async fn publish_progress(
    ctx: &SiteContext,
    publisher: &Publisher,
    outbox: &mut RealtimeOutbox,
    percent: f64,
    title: Option<&str>,
    description: Option<&str>,
    doctype: Option<&str>,
    docname: Option<&str>,
) {
    let mut message = Message::new();
    message.insert("percent".to_string(), json!(percent));
    message.insert("title".to_string(), json!(title));
    message.insert("description".to_string(), json!(description));

    let mut args = PublishArgs::event("progress").message(message);
    args.user = ctx.user().map(str::to_string);
    args.doctype = doctype.map(str::to_string);
    args.docname = docname.map(str::to_string);

    publish_realtime(ctx, publisher, outbox, args).await;
}

/// Publish a `"task_status_change"` event to the task's progress room.
///
/// Always immediate — status transitions are never deferred. `extra` fields
/// are merged into the message before `status` and `task_id` are set.
pub async fn publish_task_status(
    ctx: &SiteContext,
    publisher: &Publisher,
    task_id: &str,
    status: &str,
    extra: Option<Message>,
) {
    let mut message = extra.unwrap_or_default();
    message.insert("status".to_string(), json!(status));
    message.insert("task_id".to_string(), json!(task_id));

    let envelope = Envelope::new(
        "task_status_change",
        message,
        rooms::task_progress_room(ctx.site(), task_id),
    );
    debug!(task_id = %task_id, status = %status, "task status change");
    publisher.emit(&envelope).await;
}

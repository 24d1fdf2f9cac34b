use serde::Serialize;

/// An interactive element inside a legacy message attachment. Buttons carry
/// a `value` that round-trips back through the action callback endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentAction {
    Button { name: String, text: String, value: String },
}

impl AttachmentAction {
    pub fn button(
        name: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Button { name: name.into(), text: label.into(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub callback_id: String,
    pub attachment_type: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AttachmentAction>,
}

/// A message bound for `chat.postMessage`. Produced by a handler, consumed
/// once by the messenger; never queued or retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

pub struct AttachmentBuilder {
    fallback: String,
    text: Option<String>,
    callback_id: String,
    actions: Vec<AttachmentAction>,
}

impl AttachmentBuilder {
    pub fn new(callback_id: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            text: None,
            callback_id: callback_id.into(),
            actions: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn button(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.actions.push(AttachmentAction::button(name, label, value));
        self
    }

    pub fn build(self) -> Attachment {
        Attachment {
            fallback: self.fallback,
            text: self.text,
            callback_id: self.callback_id,
            attachment_type: "default",
            actions: self.actions,
        }
    }
}

pub const GREETING_CALLBACK_ID: &str = "setup_os_pick";

/// The canonical greeting: fixed text plus the Mac/Windows buttons whose
/// values feed the action dispatch.
pub fn greeting_message(channel: &str) -> OutboundMessage {
    OutboundMessage {
        channel: channel.to_string(),
        text: "Hi there! :wave: I can walk you through getting set up.".to_string(),
        attachments: vec![AttachmentBuilder::new(
            GREETING_CALLBACK_ID,
            "Which operating system are you using?",
        )
        .text("Which operating system are you using?")
        .button("os", "Mac", "mac")
        .button("os", "Windows", "win")
        .build()],
    }
}

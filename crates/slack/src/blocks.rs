use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            url: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Slack opens `url` natively on click while still delivering the action
    /// event, which is what lets a link button double as a tracking hook.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub label: TextObject,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Image { image_url: String, alt_text: String },
    MultiStaticSelect {
        action_id: String,
        placeholder: TextObject,
        option_groups: Vec<OptionGroup>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchActionConfig {
    pub trigger_actions_on: Vec<String>,
}

impl DispatchActionConfig {
    pub fn on_enter() -> Self {
        Self { trigger_actions_on: vec!["on_enter_pressed".to_owned()] }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        placeholder: TextObject,
        initial_value: String,
        dispatch_action_config: DispatchActionConfig,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Context {
        elements: Vec<TextObject>,
    },
    Actions {
        elements: Vec<ButtonElement>,
    },
    Input {
        block_id: String,
        dispatch_action: bool,
        label: TextObject,
        element: InputElement,
    },
    Divider,
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header { text: TextObject::plain(text) }
    }

    pub fn section(text: TextObject) -> Self {
        Self::Section { block_id: None, text, accessory: None }
    }

    pub fn context(elements: Vec<TextObject>) -> Self {
        Self::Context { elements }
    }

    pub fn actions(elements: Vec<ButtonElement>) -> Self {
        Self::Actions { elements }
    }
}

/// A chat message: fallback text for notifications plus the block list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Modal,
    Home,
}

/// A modal or home-tab view. `private_metadata` carries the encoded session
/// context across the view's round trips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViewPayload {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    pub blocks: Vec<Block>,
    pub private_metadata: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
}

pub const MODAL_TITLE: &str = "Scout Search";

/// Slack rejects modal titles longer than 25 characters.
const MODAL_TITLE_LIMIT: usize = 25;

pub fn modal_view(blocks: Vec<Block>, private_metadata: String) -> ViewPayload {
    ViewPayload {
        kind: ViewKind::Modal,
        blocks,
        private_metadata,
        title: Some(TextObject::plain(limit_length(MODAL_TITLE, MODAL_TITLE_LIMIT))),
        close: Some(TextObject::plain("Close")),
    }
}

pub fn home_view(blocks: Vec<Block>, private_metadata: String) -> ViewPayload {
    ViewPayload { kind: ViewKind::Home, blocks, private_metadata, title: None, close: None }
}

pub fn limit_length(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(4)).collect();
        format!("{kept}...")
    } else {
        text.to_owned()
    }
}

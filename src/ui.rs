use crate::state::AppState;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            content_description: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            enabled: None,
            content_description: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Column",
            padding: None,
            children,
            content_description: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Grid<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Grid<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Grid",
            children,
            columns: None,
            padding: None,
            content_description: None,
        }
    }

    pub fn columns(mut self, cols: u32) -> Self {
        self.columns = Some(cols);
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Card<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
}

impl<'a> Card<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Card",
            children,
            title: None,
            padding: None,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }
}

#[derive(Serialize)]
pub struct Section<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<&'a str>,
}

impl<'a> Section<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Section",
            children,
            title: None,
            subtitle: None,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn subtitle(mut self, subtitle: &'a str) -> Self {
        self.subtitle = Some(subtitle);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_on_submit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_line: Option<bool>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            text: None,
            hint: None,
            action_on_submit: None,
            debounce_ms: None,
            single_line: None,
        }
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn action_on_submit(mut self, action: &'a str) -> Self {
        self.action_on_submit = Some(action);
        self
    }

    pub fn debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = Some(ms);
        self
    }

    pub fn single_line(mut self, single: bool) -> Self {
        self.single_line = Some(single);
        self
    }
}

#[derive(Serialize)]
pub struct Checkbox<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
}

impl<'a> Checkbox<'a> {
    pub fn new(text: &'a str, bind_key: &'a str) -> Self {
        Self {
            kind: "Checkbox",
            text,
            bind_key,
            checked: None,
            action: None,
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }
}

/// Lazily rendered list; the shell only inflates visible rows.
#[derive(Serialize)]
pub struct VirtualList<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_item_height: Option<u32>,
}

impl<'a> VirtualList<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "VirtualList",
            children,
            id: None,
            estimated_item_height: None,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn estimated_item_height(mut self, height: u32) -> Self {
        self.estimated_item_height = Some(height);
        self
    }
}

pub fn maybe_push_back(children: &mut Vec<Value>, state: &AppState) {
    if state.nav_depth() > 1 {
        children.push(json!({
            "type": "Button",
            "text": "Back",
            "action": "back"
        }));
    }
}

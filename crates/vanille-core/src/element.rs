//! Structural snapshots of trigger elements.
//!
//! The dispatcher never touches a live DOM. The UI layer describes the
//! element that triggered a request (its kind, attributes, the `data-*`
//! attributes visible in its parent container, and for forms the controls it
//! contains) and everything downstream works from that description.

use crate::{FormatHint, TypedValue};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an element in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The two kinds of trigger the toolkit distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A form; parameters come from its hidden inputs.
    Form,
    /// A single control (button, link); parameters come from `data-*` attributes.
    Control,
}

/// Tag of a control inside a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTag {
    Input,
    Select,
    Textarea,
    Button,
    /// Static text such as a paragraph. Never carries a value.
    Text,
}

/// A file selected in a file input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A control inside a form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    pub name: String,
    pub tag: ControlTag,
    /// The `type` attribute of inputs (`text`, `hidden`, `number`, ...).
    pub input_type: Option<String>,
    /// The `step` attribute of number inputs.
    pub step: Option<String>,
    pub value: Option<String>,
    pub checked: bool,
    pub files: Vec<FileBlob>,
    pub id: Option<ElementId>,
}

impl FieldSnapshot {
    fn input(name: impl Into<String>, input_type: &str, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            tag: ControlTag::Input,
            input_type: Some(input_type.to_string()),
            step: None,
            value,
            checked: false,
            files: Vec::new(),
            id: None,
        }
    }

    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::input(name, "hidden", Some(value.into()))
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::input(name, "text", Some(value.into()))
    }

    pub fn number(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::input(name, "number", Some(value.into()))
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::input(name, "checkbox", Some("on".to_string()))
        }
    }

    pub fn file(name: impl Into<String>, files: Vec<FileBlob>) -> Self {
        Self {
            files,
            ..Self::input(name, "file", None)
        }
    }

    pub fn select(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: ControlTag::Select,
            input_type: None,
            ..Self::input(name, "", Some(value.into()))
        }
    }

    pub fn textarea(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: ControlTag::Textarea,
            input_type: None,
            ..Self::input(name, "", Some(value.into()))
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self {
            tag: ControlTag::Button,
            input_type: Some("button".to_string()),
            ..Self::input(name, "", None)
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn type_is(&self, ty: &str) -> bool {
        self.input_type.as_deref() == Some(ty)
    }

    /// Format implied by the control itself, or `None` for controls that
    /// never carry a value.
    pub fn format_hint(&self) -> Option<FormatHint> {
        match self.tag {
            ControlTag::Button | ControlTag::Text => None,
            ControlTag::Select | ControlTag::Textarea => Some(FormatHint::Str),
            ControlTag::Input if self.type_is("checkbox") => Some(FormatHint::Bool),
            ControlTag::Input if self.type_is("number") && self.step.is_some() => {
                Some(FormatHint::Float)
            }
            ControlTag::Input if self.type_is("number") => Some(FormatHint::Int),
            ControlTag::Input => Some(FormatHint::Str),
        }
    }

    /// Coerce the control's value. A declared hint wins over the control type.
    pub fn typed(&self, declared: Option<FormatHint>) -> Option<TypedValue> {
        let hint = match self.tag {
            ControlTag::Button | ControlTag::Text => return None,
            _ => declared.or_else(|| self.format_hint())?,
        };
        Some(hint.coerce(self.value.as_deref(), self.checked))
    }
}

/// Description of the element that triggered a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Attributes of the element itself.
    pub attributes: BTreeMap<String, String>,
    /// `data-*` attributes found in the element's parent container.
    pub container: BTreeMap<String, String>,
    /// Controls contained in a form. Empty for plain controls.
    pub fields: Vec<FieldSnapshot>,
    /// Submit button of a form, which carries the loading marker.
    pub submit: Option<ElementId>,
}

impl ElementSnapshot {
    fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: BTreeMap::new(),
            container: BTreeMap::new(),
            fields: Vec::new(),
            submit: None,
        }
    }

    pub fn form(id: impl Into<ElementId>) -> Self {
        Self::new(id, ElementKind::Form)
    }

    pub fn control(id: impl Into<ElementId>) -> Self {
        Self::new(id, ElementKind::Control)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_container_attr(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.container.insert(name.into(), value.into());
        self
    }

    pub fn with_field(mut self, field: FieldSnapshot) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_submit(mut self, id: impl Into<ElementId>) -> Self {
        self.submit = Some(id.into());
        self
    }

    /// A non-empty attribute of the element.
    pub fn attr(&self, name: &str) -> Option<&str> {
        non_empty(self.attributes.get(name))
    }

    /// A non-empty attribute of the parent container.
    pub fn container_attr(&self, name: &str) -> Option<&str> {
        non_empty(self.container.get(name))
    }

    /// First control with the given name.
    pub fn field(&self, name: &str) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Non-empty value of the named control.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.field(name)?.value.as_deref().filter(|v| !v.is_empty())
    }

    /// Every file selected in the form's file inputs, in document order.
    pub fn files(&self) -> Vec<FileBlob> {
        self.fields
            .iter()
            .flat_map(|f| f.files.iter().cloned())
            .collect()
    }

    /// Element that shows the loading marker: a form's submit button when it
    /// has one, otherwise the element itself.
    pub fn loading_target(&self) -> &ElementId {
        match self.kind {
            ElementKind::Form => self.submit.as_ref().unwrap_or(&self.id),
            ElementKind::Control => &self.id,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_from_control_type() {
        assert_eq!(FieldSnapshot::checkbox("a", true).format_hint(), Some(FormatHint::Bool));
        assert_eq!(FieldSnapshot::number("a", "1").format_hint(), Some(FormatHint::Int));
        assert_eq!(
            FieldSnapshot::number("a", "1").with_step("0.1").format_hint(),
            Some(FormatHint::Float)
        );
        assert_eq!(FieldSnapshot::text("a", "1").format_hint(), Some(FormatHint::Str));
        assert_eq!(FieldSnapshot::button("a").format_hint(), None);
    }

    #[test]
    fn declared_hint_wins() {
        let field = FieldSnapshot::text("limit", "12");
        assert_eq!(field.typed(Some(FormatHint::Int)), Some(TypedValue::Int(Some(12))));
        assert_eq!(field.typed(None), Some(TypedValue::Str("12".into())));
        assert_eq!(FieldSnapshot::button("go").typed(Some(FormatHint::Str)), None);
    }

    #[test]
    fn loading_target_prefers_submit_button() {
        let form = ElementSnapshot::form("settings").with_submit("settings-submit");
        assert_eq!(form.loading_target().as_str(), "settings-submit");
        assert_eq!(ElementSnapshot::form("bare").loading_target().as_str(), "bare");
        let control = ElementSnapshot::control("purge").with_submit("ignored");
        assert_eq!(control.loading_target().as_str(), "purge");
    }

    #[test]
    fn files_collected_in_order() {
        let form = ElementSnapshot::form("upload")
            .with_field(FieldSnapshot::file("a", vec![FileBlob::new("one.txt", b"1".to_vec())]))
            .with_field(FieldSnapshot::text("note", "x"))
            .with_field(FieldSnapshot::file("b", vec![FileBlob::new("two.txt", b"22".to_vec())]));
        let names: Vec<_> = form.files().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["one.txt", "two.txt"]);
    }
}

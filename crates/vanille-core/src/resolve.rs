//! Implicit request parameter resolution.
//!
//! Call sites rarely pass the action, token or endpoint explicitly. They are
//! normally read from the trigger element by convention: hidden inputs in a
//! form, `data-*` attributes on a control or its parent container. For each
//! parameter the first match wins:
//!
//! 1. the explicit value,
//! 2. for a form, the hidden input of the conventional name,
//! 3. for a control, the `data-*` attribute on the element or its container.

use crate::{ElementKind, ElementSnapshot, TransportKind};

/// Values given at the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitParams {
    pub action: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

/// Parameters after resolution. Defaults and namespacing are applied by the
/// dispatcher, which knows which of them are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedParams {
    pub action: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

/// Conventional names for one transport's token.
struct TokenNames {
    field: &'static str,
    attr: &'static str,
}

fn token_names(kind: TransportKind) -> TokenNames {
    match kind {
        TransportKind::Legacy => TokenNames {
            field: "nonce",
            attr: "data-nonce",
        },
        TransportKind::Rest => TokenNames {
            field: "rest-token",
            attr: "data-token",
        },
    }
}

/// Resolve action, token and endpoint for a request sent over `kind`.
pub fn resolve(
    element: &ElementSnapshot,
    explicit: &ExplicitParams,
    kind: TransportKind,
) -> ResolvedParams {
    let token = token_names(kind);

    let from_element = |field: &str, attr: &str, container_first: bool| -> Option<String> {
        let found = match element.kind {
            ElementKind::Form => element.field_value(field),
            ElementKind::Control if container_first => element
                .container_attr(attr)
                .or_else(|| element.attr(attr)),
            ElementKind::Control => element.attr(attr).or_else(|| element.container_attr(attr)),
        };
        found.map(str::to_string)
    };

    ResolvedParams {
        action: non_empty(explicit.action.as_deref())
            .or_else(|| from_element("action", "data-action", false)),
        token: non_empty(explicit.token.as_deref())
            .or_else(|| from_element(token.field, token.attr, true)),
        endpoint: non_empty(explicit.endpoint.as_deref())
            .or_else(|| from_element("endpoint", "data-endpoint", true)),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

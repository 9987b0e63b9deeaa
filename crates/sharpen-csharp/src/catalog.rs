//! Static registry of ASP.NET Core action-result kinds.
//!
//! The registry replaces runtime discovery of the result-type hierarchy:
//! every concrete kind of the two families is enumerated here with its
//! simple name, family, and HTTP status code, and constructor arity falls
//! out of the family (status-code results construct with no arguments,
//! object results with one). Name resolution searches the status-code
//! family first, then the object family; the first match wins.

use crate::cst::{AttributeArguments, AttributeItem, AttributeList, TokenNode};

// ============================================================================
// Result kinds
// ============================================================================

/// Which abstract result family a kind descends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFamily {
    /// `StatusCodeResult` descendants: a bare status code.
    StatusCode,
    /// `ObjectResult` descendants: a status code plus a content payload.
    Object,
}

/// One concrete action-result kind.
#[derive(Debug, PartialEq, Eq)]
pub struct ResultKind {
    name: &'static str,
    family: ResultFamily,
    status_code: u16,
}

impl ResultKind {
    /// Simple type name, e.g. `OkObjectResult`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn family(&self) -> ResultFamily {
        self.family
    }

    /// The HTTP status code the kind produces.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Arguments the kind's constructor requires: none for the status-code
    /// family, one payload for the object family.
    pub fn ctor_arity(&self) -> usize {
        match self.family {
            ResultFamily::StatusCode => 0,
            ResultFamily::Object => 1,
        }
    }

    /// Argument text for a synthesized `ProducesResponseType` attribute.
    pub fn produces_arguments(&self) -> String {
        format!("typeof({}), {}", self.name, self.status_code)
    }
}

const STATUS_CODE_RESULTS: &[ResultKind] = &[
    ResultKind { name: "OkResult", family: ResultFamily::StatusCode, status_code: 200 },
    ResultKind { name: "NoContentResult", family: ResultFamily::StatusCode, status_code: 204 },
    ResultKind { name: "BadRequestResult", family: ResultFamily::StatusCode, status_code: 400 },
    ResultKind { name: "UnauthorizedResult", family: ResultFamily::StatusCode, status_code: 401 },
    ResultKind { name: "NotFoundResult", family: ResultFamily::StatusCode, status_code: 404 },
    ResultKind { name: "ConflictResult", family: ResultFamily::StatusCode, status_code: 409 },
    ResultKind {
        name: "UnsupportedMediaTypeResult",
        family: ResultFamily::StatusCode,
        status_code: 415,
    },
    ResultKind {
        name: "UnprocessableEntityResult",
        family: ResultFamily::StatusCode,
        status_code: 422,
    },
];

const OBJECT_RESULTS: &[ResultKind] = &[
    ResultKind { name: "OkObjectResult", family: ResultFamily::Object, status_code: 200 },
    ResultKind { name: "AcceptedResult", family: ResultFamily::Object, status_code: 202 },
    ResultKind {
        name: "BadRequestObjectResult",
        family: ResultFamily::Object,
        status_code: 400,
    },
    ResultKind {
        name: "UnauthorizedObjectResult",
        family: ResultFamily::Object,
        status_code: 401,
    },
    ResultKind { name: "NotFoundObjectResult", family: ResultFamily::Object, status_code: 404 },
    ResultKind { name: "ConflictObjectResult", family: ResultFamily::Object, status_code: 409 },
    ResultKind {
        name: "UnprocessableEntityObjectResult",
        family: ResultFamily::Object,
        status_code: 422,
    },
];

/// Every registered kind of one family, in registry order.
pub fn result_kinds(family: ResultFamily) -> impl Iterator<Item = &'static ResultKind> {
    match family {
        ResultFamily::StatusCode => STATUS_CODE_RESULTS.iter(),
        ResultFamily::Object => OBJECT_RESULTS.iter(),
    }
}

/// Resolve a simple name against the registry: status-code family first,
/// then object family, first match wins.
pub fn resolve_result_kind(name: &str) -> Option<&'static ResultKind> {
    STATUS_CODE_RESULTS
        .iter()
        .chain(OBJECT_RESULTS.iter())
        .find(|kind| kind.name == name)
}

// ============================================================================
// Attribute markers
// ============================================================================

pub const AUTHORIZE_ATTRIBUTE: &str = "AuthorizeAttribute";
pub const API_CONTROLLER_ATTRIBUTE: &str = "ApiControllerAttribute";
pub const ROUTE_ATTRIBUTE: &str = "RouteAttribute";
pub const PRODUCES_RESPONSE_TYPE_ATTRIBUTE: &str = "ProducesResponseTypeAttribute";

/// Default route template for synthesized `Route` attributes.
pub const DEFAULT_ROUTE_TEMPLATE: &str = "\"api/[controller]\"";

/// Attribute name for a marker type: one trailing `Attribute` suffix is
/// stripped, matching how the name is written in source.
pub fn attribute_name(type_name: &str) -> &str {
    type_name.strip_suffix("Attribute").unwrap_or(type_name)
}

/// Build an attribute list node for a marker type with optional raw
/// argument text, passed through unparsed.
pub fn build_attribute_list(type_name: &str, arguments: Option<&str>) -> AttributeList {
    let arguments = arguments.map(|text| AttributeArguments {
        open: TokenNode::bare("("),
        text: TokenNode::bare(text),
        close: TokenNode::bare(")"),
    });
    AttributeList {
        open: TokenNode::bare("["),
        attributes: vec![AttributeItem {
            name: TokenNode::bare(attribute_name(type_name)),
            arguments,
            comma: None,
        }],
        close: TokenNode::bare("]"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::render;

    #[test]
    fn status_family_wins_name_resolution() {
        let ok = resolve_result_kind("OkResult").expect("registered");
        assert_eq!(ok.family(), ResultFamily::StatusCode);
        assert_eq!(ok.status_code(), 200);
        assert_eq!(ok.ctor_arity(), 0);

        let ok_object = resolve_result_kind("OkObjectResult").expect("registered");
        assert_eq!(ok_object.family(), ResultFamily::Object);
        assert_eq!(ok_object.ctor_arity(), 1);
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        assert!(resolve_result_kind("FileStreamResult").is_none());
        assert!(resolve_result_kind("").is_none());
    }

    #[test]
    fn families_do_not_overlap() {
        for status in result_kinds(ResultFamily::StatusCode) {
            assert!(
                result_kinds(ResultFamily::Object).all(|o| o.name() != status.name()),
                "{} registered twice",
                status.name()
            );
        }
    }

    #[test]
    fn produces_arguments_embed_name_and_code() {
        let not_found = resolve_result_kind("NotFoundObjectResult").expect("registered");
        assert_eq!(
            not_found.produces_arguments(),
            "typeof(NotFoundObjectResult), 404"
        );
    }

    #[test]
    fn attribute_name_strips_one_suffix() {
        assert_eq!(attribute_name("AuthorizeAttribute"), "Authorize");
        assert_eq!(attribute_name("Route"), "Route");
    }

    #[test]
    fn build_attribute_list_renders_as_written() {
        let plain = build_attribute_list(API_CONTROLLER_ATTRIBUTE, None);
        assert_eq!(render(&plain), "[ApiController]");

        let with_args = build_attribute_list(ROUTE_ATTRIBUTE, Some(DEFAULT_ROUTE_TEMPLATE));
        assert_eq!(render(&with_args), "[Route(\"api/[controller]\")]");
        assert_eq!(with_args.render_trimmed(), "[Route(\"api/[controller]\")]");
    }
}

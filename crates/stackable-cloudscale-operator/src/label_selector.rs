use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use snafu::Snafu;

type Result<T, E = SelectorError> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum SelectorError {
    #[snafu(display("label selector with binary operator {operator:?} must have values"))]
    LabelSelectorBinaryOperatorWithoutValues { operator: String },

    #[snafu(display("label selector with unary operator {operator:?} must not have values"))]
    LabelSelectorUnaryOperatorWithValues { operator: String },

    #[snafu(display("labelSelector has an invalid operator {operator:?}"))]
    LabelSelectorInvalidOperator { operator: String },
}

/// This trait extends the functionality of [`LabelSelector`].
pub trait LabelSelectorExt {
    /// Converts the selector into the query string accepted by list requests,
    /// so that the API server does the filtering. It will return an error if
    /// the LabelSelector contains illegal things (e.g. an `Exists` operator
    /// with a value).
    ///
    /// An empty selector yields an empty string, which selects everything.
    fn to_query_string(&self) -> Result<String>;
}

impl LabelSelectorExt for LabelSelector {
    fn to_query_string(&self) -> Result<String> {
        // match_labels are the equivalent of the "In" operator with a single value
        let labels = self
            .match_labels
            .iter()
            .flatten()
            .map(|(key, value)| Ok(format!("{key}={value}")));
        let expressions = self
            .match_expressions
            .iter()
            .flatten()
            .map(requirement_to_query);

        Ok(labels
            .chain(expressions)
            .collect::<Result<Vec<_>>>()?
            .join(","))
    }
}

fn requirement_to_query(requirement: &LabelSelectorRequirement) -> Result<String> {
    let key = &requirement.key;
    let values = requirement.values.as_deref().unwrap_or_default();

    match requirement.operator.as_str() {
        operator @ ("In" | "NotIn") => {
            if values.is_empty() {
                return LabelSelectorBinaryOperatorWithoutValuesSnafu { operator }.fail();
            }
            Ok(format!(
                "{key} {} ({})",
                operator.to_ascii_lowercase(),
                values.join(", ")
            ))
        }
        operator @ ("Exists" | "DoesNotExist") => {
            if !values.is_empty() {
                return LabelSelectorUnaryOperatorWithValuesSnafu { operator }.fail();
            }
            Ok(if operator == "Exists" {
                key.clone()
            } else {
                format!("!{key}")
            })
        }
        operator => LabelSelectorInvalidOperatorSnafu { operator }.fail(),
    }
}

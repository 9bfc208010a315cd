//! One-shot source-to-source conversion from HAML to ERB.
//!
//! The pipeline is: [`parser::parse`] turns source text into a [`ast::Node`]
//! tree, [`emitter::emit`] walks it producing ERB text (leaning on
//! [`attrs::build`] for tag attributes and [`interpolation::convert`] for
//! `#{}` substitutions). [`validate`] and [`convert_and_validate`] run the
//! built-in structural ERB checker over the result. [`convert_file`] and
//! [`convert_directory`] are the driver layer a migration CLI needs on top
//! of the pure `convert` function.
//!
//! The HAML reader in [`parser`] is this crate's own — no published crate
//! exposes the exact AST shape this pipeline is specified against, so it's
//! implemented here rather than assumed external. It covers the node kinds
//! and fields the pipeline consumes and nothing beyond that.

mod ast;
mod attrs;
mod driver;
mod emitter;
mod error;
mod interpolation;
mod literal;
mod parser;
mod scan;
mod validate;

pub use ast::Node;
pub use driver::{convert_directory, convert_file, ConvertFileOptions, FileResult};
pub use error::Error;
pub use validate::{ValidationError, ValidationResult};

/// Converts a HAML source string to ERB. Pure and synchronous: no I/O, no
/// shared state.
pub fn convert(haml: &str) -> Result<String, Error> {
    let tree = parser::parse(haml)?;
    emitter::emit(&tree, 0)
}

/// Runs the built-in structural checker over an already-converted ERB
/// string.
pub fn validate(erb: &str) -> ValidationResult {
    validate::validate(erb)
}

/// Converts HAML to ERB and immediately validates the result, bundling
/// both outcomes the way a caller checking `--check` output wants them.
pub struct ConvertAndValidate {
    pub erb: Option<String>,
    pub errors: Vec<ValidationErrorLike>,
}

/// Either a conversion-time [`Error`] or a post-conversion
/// [`ValidationError`] — both are reported back through the same
/// `{ erb, errors }` shape the spec's façade describes.
pub enum ValidationErrorLike {
    Conversion(Error),
    Structural(ValidationError),
}

pub fn convert_and_validate(haml: &str) -> ConvertAndValidate {
    match convert(haml) {
        Ok(erb) => {
            let result = validate::validate(&erb);
            ConvertAndValidate {
                erb: Some(erb),
                errors: result.errors.into_iter().map(ValidationErrorLike::Structural).collect(),
            }
        }
        Err(e) => ConvertAndValidate {
            erb: None,
            errors: vec![ValidationErrorLike::Conversion(e)],
        },
    }
}

#[cfg(test)]
mod golden_tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn simple_tag_tree() {
        let haml = "%html\n  %body\n    %h1 Hello, \\#{name}!\n";
        let erb = convert(haml).unwrap();
        assert_eq!(
            erb,
            "<html>\n  <body>\n    <h1>Hello, #{name}!</h1>\n  </body>\n</html>\n"
        );
    }

    #[test]
    fn interpolated_text_and_dynamic_attribute() {
        let haml = r#"%a{ href: path }= "Hi #{user.name}""#;
        let erb = convert(haml).unwrap();
        assert_eq!(erb, "<a href=\"<%= path %>\">Hi <%= user.name %></a>\n");
    }

    #[test]
    fn control_flow_block_round_trips_and_validates() {
        let haml = "- if logged_in\n  %p Welcome\n- else\n  %p Please log in\n";
        let erb = convert(haml).unwrap();
        assert_eq!(
            erb,
            "<% if logged_in %>\n  <p>Welcome</p>\n<% else %>\n  <p>Please log in</p>\n<% end %>\n"
        );
        assert!(validate(&erb).success);
    }

    #[test]
    fn doctype_and_void_element() {
        let haml = "!!!\n%br/\n";
        let erb = convert(haml).unwrap();
        assert_eq!(erb, "<!DOCTYPE html>\n<br>\n");
    }

    #[test]
    fn convert_and_validate_reports_both_outcomes_together() {
        let result = convert_and_validate("%div\n  %p hi\n");
        assert!(result.erb.is_some());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn syntax_error_surfaces_a_line_number() {
        let err = convert("%div\n %p bad indent\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: Some(2), .. }));
    }
}

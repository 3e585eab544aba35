//! Extraction of resource detail fields from `DescribeStackResource` responses.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;

use crate::error::CfnError;

/// Element below the document root holding the result.
const RESULT_ELEMENT: &str = "DescribeStackResourceResult";

/// Element below the result holding the resource fields.
const DETAIL_ELEMENT: &str = "StackResourceDetail";

/// Return the text of `DescribeStackResourceResult/StackResourceDetail/<field>`.
///
/// The path is matched from the document root on local names, so namespace
/// prefixes are ignored. Only the first matching element is used, and only its
/// own text (not that of nested elements) is returned.
///
/// # Errors
///
/// Returns `CfnError::MetadataNotAvailable` if the document is malformed or the
/// element does not exist.
pub fn extract_field(xml: &str, field: &str) -> Result<String, CfnError> {
    let target = [RESULT_ELEMENT, DETAIL_ELEMENT, field];
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut captured: Option<String> = None;
    let mut capture_depth = 0;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                if captured.is_none() && is_target(&stack, &target) {
                    captured = Some(String::new());
                    capture_depth = stack.len();
                }
            }
            Event::Empty(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                if captured.is_none() && is_target(&stack, &target) {
                    return Ok(String::new());
                }
                stack.pop();
            }
            Event::End(_) => {
                if stack.len() == capture_depth {
                    if let Some(text) = captured.take() {
                        return Ok(text);
                    }
                }
                stack.pop();
            }
            Event::Text(e) => {
                if let Some(text) = captured.as_mut().filter(|_| stack.len() == capture_depth) {
                    text.push_str(&e.xml_content().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(text) = captured.as_mut().filter(|_| stack.len() == capture_depth) {
                    text.push_str(&e.decode().map_err(xml_error)?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(text) = captured.as_mut().filter(|_| stack.len() == capture_depth) {
                    text.push_str(&resolve_reference(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(CfnError::not_available(format!(
        "element {}/{}/{} not found in response",
        RESULT_ELEMENT, DETAIL_ELEMENT, field
    )))
}

/// The stack includes the document root, which may have any name.
fn is_target(stack: &[String], target: &[&str]) -> bool {
    stack.len() == target.len() + 1 && stack[1..].iter().zip(target).all(|(a, b)| a == b)
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, CfnError> {
    if let Some(ch) = reference.resolve_char_ref().map_err(xml_error)? {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(xml_error)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| CfnError::not_available(format!("unknown xml entity &{};", name)))
}

fn xml_error(e: impl std::fmt::Display) -> CfnError {
    CfnError::not_available(format!("invalid xml response: {}", e))
}

//! Model reply parsing.
//!
//! The model answers with a JSON object such as
//! `{"tool_calls": [{"name": "show_map", "args": {"image": "$image_0$"}}], "audio": "..."}`.
//! Image arguments are written as `"$image_<N>$"` and resolved against the
//! agent's image store.

use crate::error::{GeoAwareError, Result};
use crate::image::ImageHandle;
use crate::tools::{ArgValue, ToolArgs, ToolInvocation};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static INPUT_IMAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\$image_(?P<num>[0-9]+)\$""#).unwrap());

static RESOLVED_IMAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<image_(?P<num>[0-9]+)>").unwrap());

/// Everything in the reply except `tool_calls`.
pub type ResponseInfo = Map<String, Value>;

/// Split a raw model reply into tool calls and the remaining payload.
///
/// `images` is only read.
pub fn extract_info(
    response: &str,
    images: &[ImageHandle],
) -> Result<(Vec<ToolInvocation>, ResponseInfo)> {
    let rewritten = INPUT_IMAGE_TOKEN.replace_all(response, "\"<image_${num}>\"");

    let value: Value = serde_json::from_str(&rewritten)
        .map_err(|e| GeoAwareError::MalformedResponse(format!("Invalid JSON: {}", e)))?;
    let Value::Object(mut info) = value else {
        return Err(GeoAwareError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    };

    let raw_calls = info
        .remove("tool_calls")
        .ok_or_else(|| GeoAwareError::MalformedResponse("missing 'tool_calls'".to_string()))?;
    let Value::Array(raw_calls) = raw_calls else {
        return Err(GeoAwareError::MalformedResponse(
            "'tool_calls' must be an array".to_string(),
        ));
    };

    let mut calls = Vec::with_capacity(raw_calls.len());
    for raw in raw_calls {
        let mut call = parse_call(raw)?;
        resolve_images(&mut call.args, images)?;
        calls.push(call);
    }

    Ok((calls, info))
}

fn parse_call(raw: Value) -> Result<ToolInvocation> {
    let Value::Object(mut call) = raw else {
        return Err(GeoAwareError::MalformedResponse(
            "tool call must be an object".to_string(),
        ));
    };

    let name = match call.remove("name") {
        Some(Value::String(name)) => name,
        _ => {
            return Err(GeoAwareError::MalformedResponse(
                "tool call is missing a string 'name'".to_string(),
            ))
        }
    };

    let args = match call.remove("args") {
        Some(Value::Object(args)) => args,
        _ => {
            return Err(GeoAwareError::MalformedResponse(format!(
                "tool call '{}' is missing an object 'args'",
                name
            )))
        }
    };

    Ok(ToolInvocation::new(name, ToolArgs::from_json(args)))
}

fn resolve_images(args: &mut ToolArgs, images: &[ImageHandle]) -> Result<()> {
    for value in args.values_mut() {
        let index = match value {
            ArgValue::Json(Value::String(s)) => match RESOLVED_IMAGE_TOKEN.captures(s) {
                Some(caps) => caps["num"].parse::<usize>().map_err(|_| {
                    GeoAwareError::ImageReference {
                        index: usize::MAX,
                        available: images.len(),
                    }
                })?,
                None => continue,
            },
            _ => continue,
        };

        let image = images.get(index).ok_or(GeoAwareError::ImageReference {
            index,
            available: images.len(),
        })?;
        *value = ArgValue::Image(image.clone());
    }
    Ok(())
}

/// Read a required string field from the reply payload.
pub fn info_field<'a>(info: &'a ResponseInfo, key: &str) -> Result<&'a str> {
    info.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GeoAwareError::MissingField(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(n: usize) -> Vec<ImageHandle> {
        (0..n)
            .map(|i| ImageHandle::from_bytes(vec![i as u8], "image/png"))
            .collect()
    }

    #[test]
    fn test_well_formed_reply() {
        let (calls, info) = extract_info(
            r#"{"tool_calls":[{"name":"t","args":{"x":1}}],"audio":"hi"}"#,
            &[],
        )
        .unwrap();

        assert_eq!(
            calls,
            vec![ToolInvocation::new("t", ToolArgs::new().with("x", json!(1)))]
        );
        assert_eq!(Value::Object(info), json!({"audio": "hi"}));
    }

    #[test]
    fn test_image_placeholder_resolves_to_handle() {
        let images = store(3);
        let (calls, _) = extract_info(
            r#"{"tool_calls":[{"name":"inspect","args":{"img":"$image_2$","label":"x"}}],"audio":""}"#,
            &images,
        )
        .unwrap();

        assert_eq!(calls[0].args.get("img"), Some(&ArgValue::Image(images[2].clone())));
        assert_eq!(calls[0].args.get_str("label"), Some("x"));
    }

    #[test]
    fn test_image_placeholder_out_of_range() {
        let err = extract_info(
            r#"{"tool_calls":[{"name":"inspect","args":{"img":"$image_2$"}}],"audio":""}"#,
            &store(2),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            GeoAwareError::ImageReference { index: 2, available: 2 }
        ));
    }

    #[test]
    fn test_placeholder_only_rewritten_as_whole_string() {
        let images = store(1);
        let (calls, _) = extract_info(
            r#"{"tool_calls":[{"name":"say","args":{"text":"see $image_0$ here"}}],"audio":""}"#,
            &images,
        )
        .unwrap();
        assert_eq!(calls[0].args.get_str("text"), Some("see $image_0$ here"));
    }

    #[test]
    fn test_malformed_replies() {
        for reply in [
            r#"{"tool_calls":"#,
            "not json",
            "[1, 2]",
            r#"{"audio": "no calls"}"#,
            r#"{"tool_calls": {"name": "t"}}"#,
            r#"{"tool_calls": [{"args": {}}]}"#,
            r#"{"tool_calls": [{"name": "t"}]}"#,
        ] {
            let err = extract_info(reply, &store(1)).unwrap_err();
            assert!(
                matches!(err, GeoAwareError::MalformedResponse(_)),
                "{} gave {:?}",
                reply,
                err
            );
        }
    }

    #[test]
    fn test_info_field() {
        let (_, info) = extract_info(r#"{"tool_calls":[],"audio":"hello","n":1}"#, &[]).unwrap();
        assert_eq!(info_field(&info, "audio").unwrap(), "hello");
        assert!(matches!(info_field(&info, "n"), Err(GeoAwareError::MissingField(_))));
        assert!(matches!(info_field(&info, "text"), Err(GeoAwareError::MissingField(_))));
    }
}

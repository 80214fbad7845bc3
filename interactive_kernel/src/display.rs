//! Result display
//!
//! When a cell ends in an expression with a value, the kernel hands that
//! value to its [`DisplayHook`], which renders it through a [`Formatter`]
//! and publishes a `pyout` message.

use crate::connection::Publisher;
use ipc::{Header, Message, MsgType, PyoutContent};
use kernel_api::KernelError;
use script_engine::Value;
use serde_json::Map;

/// MIME type to representation
pub type MimeBundle = Map<String, serde_json::Value>;

/// Renders values for display
pub trait Formatter {
    fn format(&self, value: &Value) -> MimeBundle;
}

/// Renders the `repr` of a value as `text/plain`
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFormatter;

impl Formatter for PlainTextFormatter {
    fn format(&self, value: &Value) -> MimeBundle {
        let mut bundle = MimeBundle::new();
        bundle.insert(
            "text/plain".to_string(),
            serde_json::Value::String(value.repr()),
        );
        bundle
    }
}

/// Publishes cell results as `pyout`
pub struct DisplayHook {
    parent_header: Option<Header>,
    formatter: Box<dyn Formatter>,
}

impl DisplayHook {
    pub fn new(formatter: Box<dyn Formatter>) -> Self {
        Self {
            parent_header: None,
            formatter,
        }
    }

    pub fn parent_header(&self) -> Option<&Header> {
        self.parent_header.as_ref()
    }

    /// Tags future results with the header of `request`
    pub fn set_parent(&mut self, request: &Message) {
        self.parent_header = Some(ipc::extract_header(request));
    }

    /// Formats and publishes one result
    pub fn publish(
        &self,
        publisher: &mut dyn Publisher,
        value: &Value,
        execution_count: u64,
    ) -> Result<(), KernelError> {
        let content = PyoutContent {
            data: self.formatter.format(value),
            execution_count,
        };
        publisher.publish(
            MsgType::Pyout,
            serde_json::to_value(content)?,
            self.parent_header.as_ref(),
        )
    }
}

impl Default for DisplayHook {
    fn default() -> Self {
        Self::new(Box::new(PlainTextFormatter))
    }
}

impl std::fmt::Debug for DisplayHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayHook")
            .field("parent_header", &self.parent_header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::RecordingPublisher;
    use ipc::Session;
    use serde_json::json;

    struct ShoutingFormatter;

    impl Formatter for ShoutingFormatter {
        fn format(&self, value: &Value) -> MimeBundle {
            let mut bundle = MimeBundle::new();
            bundle.insert("text/plain".into(), json!(value.to_str().to_uppercase()));
            bundle
        }
    }

    #[test]
    fn test_plain_text_uses_repr() {
        let bundle = PlainTextFormatter.format(&Value::str("hi"));
        assert_eq!(bundle["text/plain"], "'hi'");
    }

    #[test]
    fn test_publish_tags_parent_and_count() {
        let mut hook = DisplayHook::default();
        let request = Session::new("client").msg("execute_request", json!({}), None);
        hook.set_parent(&request);

        let mut publisher = RecordingPublisher::default();
        hook.publish(&mut publisher, &Value::Int(42), 3).unwrap();

        let (msg_type, content, parent) = &publisher.published[0];
        assert_eq!(*msg_type, MsgType::Pyout);
        assert_eq!(content, &json!({"data": {"text/plain": "42"}, "execution_count": 3}));
        assert_eq!(parent.as_ref(), Some(&request.header));
    }

    #[test]
    fn test_custom_formatter() {
        let hook = DisplayHook::new(Box::new(ShoutingFormatter));
        let mut publisher = RecordingPublisher::default();
        hook.publish(&mut publisher, &Value::str("quiet"), 1).unwrap();
        assert_eq!(publisher.published[0].1["data"]["text/plain"], "QUIET");
    }
}

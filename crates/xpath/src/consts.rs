//! Well-known namespace and collation URIs.

/// Namespace bound to the reserved `xml` prefix.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace of namespace declarations (`xmlns`); never exposed as a namespace node.
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";
/// Namespace of W3C error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";

pub const CODEPOINT_URI: &str = "http://www.w3.org/2005/xpath-functions/collation/codepoint";
pub const SIMPLE_CASE_URI: &str = "urn:navpath:collation:simple-case";
pub const SIMPLE_ACCENT_URI: &str = "urn:navpath:collation:simple-accent";
pub const SIMPLE_CASE_ACCENT_URI: &str = "urn:navpath:collation:simple-case-accent";

//! Small helpers for reading WordprocessingML elements.

use quick_xml::events::BytesStart;

/// Attribute value by local name, ignoring the namespace prefix.
pub(crate) fn get_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Integer attribute. Some producers write decimals, so fractions are accepted.
pub(crate) fn get_attr_f32(e: &BytesStart<'_>, key: &[u8]) -> Option<f32> {
    get_attr(e, key).and_then(|s| s.trim().parse::<f32>().ok())
}

/// Twips attribute converted to points.
pub(crate) fn get_twips(e: &BytesStart<'_>, key: &[u8]) -> Option<f32> {
    get_attr_f32(e, key).map(|twips| twips / 20.0)
}

/// On/off property: present without `w:val` means on.
pub(crate) fn toggle(e: &BytesStart<'_>) -> bool {
    match get_attr(e, b"val") {
        Some(value) => !matches!(value.as_str(), "0" | "false" | "off" | "none"),
        None => true,
    }
}

/// Simple macro to prevent boilerplate of `.to_owned()`
///
/// The macro returns a `String` from the given `&str` value.
macro_rules! str {
    ($a:expr) => {
        $a.to_owned()
    };
}

pub(crate) use str;

/// Whether `s` is non-empty and consists only of ASCII digits.
pub(crate) fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Placeholder in a name format which is replaced with the object UID.
const UID_PLACEHOLDER: &str = "%s";

/// Derives the externally visible name of a resource from a name format and
/// its UID.
///
/// * An empty format yields the UID alone.
/// * A format without `%s` is used literally.
/// * Otherwise the first `%s` is replaced with the UID. Any further `%s` is
///   left untouched.
pub fn derive_name(format: &str, uid: &str) -> String {
    if format.is_empty() {
        return uid.to_owned();
    }
    format.replacen(UID_PLACEHOLDER, uid, 1)
}

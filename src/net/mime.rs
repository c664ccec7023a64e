use std::ffi::OsStr;

pub fn mime_from_ext(ext: Option<&OsStr>) -> mime::Mime {
    let Some(ext) = ext.and_then(|v| v.to_str()) else {
        return mime::APPLICATION_OCTET_STREAM;
    };

    match ext {
        "html" | "htm" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "js" => mime::APPLICATION_JAVASCRIPT,
        "json" => mime::APPLICATION_JSON,
        "txt" => mime::TEXT_PLAIN,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(mime_from_ext(Some(OsStr::new("html"))), mime::TEXT_HTML);
        assert_eq!(mime_from_ext(Some(OsStr::new("wasm"))), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(mime_from_ext(None), mime::APPLICATION_OCTET_STREAM);
    }
}

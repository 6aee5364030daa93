use std::path::Path;
use url::Url;

mod parser;

pub mod error;
pub mod types;

pub fn parse<S: AsRef<str>>(
    url: S,
) -> Result<(types::Definition, types::Namespaces), error::Error> {
    let url = {
        match Url::parse(url.as_ref()) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let path = Path::new(url.as_ref())
                    .canonicalize()
                    .map_err(|err| error::Error::PathConversionError(Some(err)))?;

                Url::from_file_path(&path).map_err(|()| error::Error::PathConversionError(None))?
            }
            Err(err) => return Err(err.into()),
        }
    };

    parser::parse(url)
}

/// Parses a document held in memory. Relative imports resolve against `file:///`.
pub fn parse_str(xml: &str) -> Result<(types::Definition, types::Namespaces), error::Error> {
    parser::parse_str(Url::parse("file:///")?, xml)
}

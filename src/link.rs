use url::Url;

use crate::{config::Config, types::book::BookId};

/// Builds links that ask the messaging bot to deliver a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinker {
    base:   String,
    bot:    String,
    prefix: String,
}

impl DeepLinker {
    pub fn new(base: impl Into<String>, bot: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base:   base.into().trim_end_matches('/').to_string(),
            bot:    bot.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.link_base, &config.bot_username, &config.link_prefix)
    }

    /// Links only reach a bot once one is named.
    pub fn has_bot(&self) -> bool {
        !self.bot.trim().is_empty()
    }

    /// `{base}/{bot}?start={prefix}{id}` with the identifier percent-encoded.
    pub fn link(&self, id: &BookId) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}/{}", self.base, self.bot))?;
        url.query_pairs_mut()
            .append_pair("start", &format!("{}{}", self.prefix, id.0));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_shape() {
        let linker = DeepLinker::new("https://t.me/", "alifdrivebot", "filep_");
        assert_eq!(
            linker.link(&"64f0c2".into()).unwrap().as_str(),
            "https://t.me/alifdrivebot?start=filep_64f0c2"
        );
    }

    #[test]
    fn identifiers_are_encoded() {
        let linker = DeepLinker::new("https://t.me", "bot", "filep_");
        let url = linker.link(&"a b&c".into()).unwrap();
        assert_eq!(url.query(), Some("start=filep_a+b%26c"));
        let (_, start) = url.query_pairs().next().unwrap();
        assert_eq!(start, "filep_a b&c");
    }
}

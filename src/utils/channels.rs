use crate::core::error::{Outcome, ToolError};
use rand::seq::SliceRandom;

/// Claims taken from a channel when no number is given
pub const DEFAULT_NUM: usize = 2;

/// A channel and how many of its newest claims to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel: String,
    pub number: usize,
}

impl ChannelSpec {
    /// Parse `@name` or `@name=N`. Channel names may contain `:` and `#`,
    /// so the count is separated by `=`.
    pub fn parse(text: &str) -> Outcome<Self> {
        let (channel, number) = match text.rsplit_once('=') {
            Some((ch, n)) => {
                let number = n.trim().parse::<usize>().map_err(|_| {
                    ToolError::InvalidInput(format!("invalid claim count in '{text}'"))
                })?;
                (ch.trim(), Some(number))
            }
            None => (text.trim(), None),
        };

        if channel.is_empty() {
            return Err(ToolError::InvalidInput("empty channel name".to_string()));
        }

        Ok(Self {
            channel: normalize_channel(channel),
            number: number.unwrap_or(DEFAULT_NUM),
        })
    }
}

/// Add the `@` prefix. Names in brackets, `[@old]`, mark invalid
/// channels and are kept as they are.
pub fn normalize_channel(channel: &str) -> String {
    if (channel.starts_with('[') && channel.ends_with(']')) || channel.starts_with('@') {
        channel.to_string()
    } else {
        format!("@{channel}")
    }
}

/// Apply a global count and optionally shuffle the order
pub fn process_channels(
    mut specs: Vec<ChannelSpec>,
    number: Option<usize>,
    shuffle: bool,
) -> Outcome<Vec<ChannelSpec>> {
    if specs.is_empty() {
        return Err(ToolError::InvalidInput("no channels given".to_string()));
    }

    if shuffle {
        specs.shuffle(&mut rand::rng());
    }

    if let Some(number) = number {
        for spec in &mut specs {
            spec.number = number;
        }
    }

    Ok(specs)
}

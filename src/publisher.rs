use crate::api::{ApiError, PostResult, XClient};
use crate::corpus::{self, CorpusError};
use crate::media::{self, MediaError};
use crate::settings::Settings;
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The two X operations a run may need.
pub trait Poster {
    async fn post_text(&self, text: &str) -> Result<PostResult, ApiError>;
    async fn post_with_media(&self, text: &str, media: &Path) -> Result<PostResult, ApiError>;
}

impl Poster for XClient {
    async fn post_text(&self, text: &str) -> Result<PostResult, ApiError> {
        self.post_tweet(text, None).await
    }

    async fn post_with_media(&self, text: &str, media: &Path) -> Result<PostResult, ApiError> {
        self.post_tweet(text, Some(media)).await
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Post(#[from] ApiError),
}

/// What a single run tweets.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDecision {
    pub text: String,
    pub media: Option<PathBuf>,
}

/// Pick a tweet, then maybe an image. The coin is only flipped when there is
/// an image to attach. Returns `None` for an empty corpus.
pub fn decide<R: Rng + ?Sized>(
    rng: &mut R,
    tweets: &[String],
    media: &[PathBuf],
    image_chance: f64,
) -> Option<PostDecision> {
    let text = tweets.choose(rng)?.clone();
    let use_image = !media.is_empty() && rng.gen_bool(image_chance);
    let media = if use_image {
        media.choose(rng).cloned()
    } else {
        None
    };
    Some(PostDecision { text, media })
}

#[derive(Debug)]
pub struct Posted {
    pub decision: PostDecision,
    pub result: PostResult,
}

impl fmt::Display for Posted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.decision.media {
            Some(path) => write!(
                f,
                "✅ Tweet posted with image: {} ({})",
                path.display(),
                self.result.url
            ),
            None => write!(f, "✅ Tweet posted (text only): {}", self.result.url),
        }
    }
}

pub struct Publisher<P, R> {
    poster: P,
    rng: R,
    tweets_file: PathBuf,
    media_dir: PathBuf,
    image_chance: f64,
}

impl<P: Poster, R: Rng> Publisher<P, R> {
    pub fn new(poster: P, rng: R, settings: &Settings) -> Self {
        Self {
            poster,
            rng,
            tweets_file: settings.tweets_file.clone(),
            media_dir: settings.media_dir.clone(),
            image_chance: settings.image_chance,
        }
    }

    /// Load the corpus and media, choose, and make exactly one post call.
    /// Loading faults return before anything is sent.
    pub async fn run(&mut self) -> Result<Posted, PublishError> {
        let tweets = corpus::load_tweets(&self.tweets_file)?;
        let media = media::list_media(&self.media_dir)?;

        let decision = decide(&mut self.rng, &tweets, &media, self.image_chance).ok_or_else(
            || CorpusError::Empty {
                path: self.tweets_file.clone(),
            },
        )?;

        let result = match &decision.media {
            Some(path) => {
                tracing::info!("Posting tweet with image {}", path.display());
                self.poster.post_with_media(&decision.text, path).await?
            }
            None => {
                tracing::info!("Posting text-only tweet");
                self.poster.post_text(&decision.text).await?
            }
        };

        tracing::info!(tweet_id = %result.tweet_id, "Tweet posted");
        Ok(Posted { decision, result })
    }
}

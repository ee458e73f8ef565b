use std::fmt;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::error::ImageError;
use crate::exercise::Exercise;
use crate::runtime::AppEvent;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A displayable illustration for an exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// One of the exercise's own image urls
    Static(String),
    /// Fallback when nothing else resolved
    Placeholder(String),
}

impl ImageRef {
    pub fn placeholder_for(exercise: &Exercise) -> Self {
        let text = exercise.name.split_whitespace().collect::<Vec<_>>().join("+");
        ImageRef::Placeholder(format!("https://placehold.co/1200x675/111/f97316?text={text}"))
    }

    pub fn location(&self) -> &str {
        match self {
            ImageRef::Static(url) | ImageRef::Placeholder(url) => url,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ImageRef::Static(_) => "image",
            ImageRef::Placeholder(_) => "placeholder",
        };
        write!(f, "{kind}: {}", self.location())
    }
}

pub trait ImageResolver: Send + Sync {
    fn resolve(&self, exercise: &Exercise) -> Result<ImageRef, ImageError>;
}

/// Checks the exercise's own image urls with `HEAD` requests
#[derive(Debug, Clone)]
pub struct HttpImageResolver {
    client: Client,
}

impl HttpImageResolver {
    pub fn new() -> Result<Self, ImageError> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl ImageResolver for HttpImageResolver {
    fn resolve(&self, exercise: &Exercise) -> Result<ImageRef, ImageError> {
        let mut last_err = ImageError::NoSource(exercise.id.clone());
        for url in &exercise.image_urls {
            match self.client.head(url).send() {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(ImageRef::Static(url.clone()));
                }
                Ok(resp) => {
                    last_err = ImageError::Unavailable {
                        url: url.clone(),
                        status: resp.status().as_u16(),
                    };
                }
                Err(e) => last_err = ImageError::Http(e),
            }
        }
        Err(last_err)
    }
}

/// Resolve on a background thread and post the outcome as an [`AppEvent`].
/// Failures turn into the placeholder; they never reach the controller.
pub fn spawn_resolve(
    resolver: std::sync::Arc<dyn ImageResolver>,
    exercise: Exercise,
    tx: Sender<AppEvent>,
) {
    thread::spawn(move || {
        let image = match resolver.resolve(&exercise) {
            Ok(image) => image,
            Err(e) => {
                warn!(exercise = %exercise.id, error = %e, "image resolution failed");
                ImageRef::placeholder_for(&exercise)
            }
        };
        // receiver gone means the app exited
        let _ = tx.send(AppEvent::ImageResolved {
            exercise_id: exercise.id,
            image,
        });
    });
}

/// The image shown for the current exercise, guarded by exercise id
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    exercise_id: Option<String>,
    image: Option<ImageRef>,
}

impl ImageSlot {
    /// Point the slot at a new exercise. Returns true if a fetch should start.
    pub fn request(&mut self, exercise_id: &str) -> bool {
        if self.exercise_id.as_deref() == Some(exercise_id) {
            return false;
        }
        self.exercise_id = Some(exercise_id.to_string());
        self.image = None;
        true
    }

    pub fn clear(&mut self) {
        self.exercise_id = None;
        self.image = None;
    }

    /// Store a result if it answers the current request; stale ones are dropped.
    pub fn accept(&mut self, exercise_id: &str, image: ImageRef) -> bool {
        if self.exercise_id.as_deref() != Some(exercise_id) {
            debug!(exercise = exercise_id, "discarding stale image");
            return false;
        }
        self.image = Some(image);
        true
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.exercise_id.is_some() && self.image.is_none()
    }
}

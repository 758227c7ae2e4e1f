//! Process-wide engine handle: owns the [`Scheduler`] and the [`FontRegistry`]
//! that [`crate::lottie::builder::LottieBuilder`] consults for text layers.
//! Mirrors the source's `Initializer::init()`/`term()` pair — a caller stands
//! one up once at startup and tears it down once at shutdown, rather than
//! threading thread-pool/font state through every call site by hand.

use std::fmt;
use std::sync::Arc;

use ahash::HashMap;

use crate::scheduler::Scheduler;
use crate::text::GlyphSource;

/// Name → glyph source lookup used by the Lottie builder to resolve a text
/// layer's `font_family` into something [`crate::text::Text::layout`] can
/// walk. Thread-safe so the same registry can back a scheduler handing
/// layers off to worker threads.
#[derive(Default)]
pub struct FontRegistry {
    fonts: HashMap<String, Arc<dyn GlyphSource + Send + Sync>>,
}

impl fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontRegistry").field("fonts", &self.fonts.keys().collect::<Vec<_>>()).finish()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, source: Arc<dyn GlyphSource + Send + Sync>) {
        self.fonts.insert(name.into(), source);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GlyphSource + Send + Sync>> {
        self.fonts.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }
}

/// Owns the process-wide scheduler and font registry. `init`/`term` bookend
/// a session the way the source's engine-lifetime functions do; there's no
/// reference counting here since ownership is a plain `Engine` value rather
/// than a global singleton.
pub struct Engine {
    scheduler: Scheduler,
    fonts: FontRegistry,
}

impl Engine {
    /// Spins up a scheduler with `thread_count` workers (`0` runs every task
    /// inline) and an empty font registry.
    pub fn init(thread_count: usize) -> Self {
        Engine { scheduler: Scheduler::new(thread_count), fonts: FontRegistry::new() }
    }

    /// Consumes the engine, joining every scheduler worker thread.
    pub fn term(self) {
        drop(self);
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::text::Glyph;

    struct StubFont;

    impl GlyphSource for StubFont {
        fn units_per_em(&self) -> f32 {
            1000.0
        }

        fn glyph(&self, _ch: char) -> Option<Glyph> {
            Some(Glyph { path: Path::new(), advance: 500.0 })
        }
    }

    #[test]
    fn registered_font_is_retrievable_by_name() {
        let mut engine = Engine::init(0);
        engine.fonts_mut().register("Roboto", Arc::new(StubFont));
        assert!(engine.fonts().contains("Roboto"));
        assert!(engine.fonts().get("Roboto").is_some());
        assert!(engine.fonts().get("Missing").is_none());
    }

    #[test]
    fn init_with_zero_threads_runs_scheduler_inline() {
        let engine = Engine::init(0);
        let handle = engine.scheduler().request(|_tid| {});
        handle.wait();
    }
}

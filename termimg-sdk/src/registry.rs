// ABOUTME: Backend registry mapping method keys to displayer constructors
// ABOUTME: Built once at startup and passed to whatever selects a backend

use crate::context::BackendContext;
use crate::displayer::{BackendKind, Displayer, UnsupportedDisplayer};
use crate::iterm2::ITerm2Displayer;
use crate::kitty::KittyDisplayer;
use crate::sixel::SixelDisplayer;
use crate::terminology::TerminologyDisplayer;
use crate::ueberzug::UeberzugDisplayer;
use crate::urxvt::{UrxvtDisplayer, UrxvtLayout};
use crate::w3m::W3mDisplayer;
use std::collections::BTreeMap;

pub type Constructor = Box<dyn Fn(&BackendContext) -> Displayer + Send + Sync>;

pub struct Registry {
    context: BackendContext,
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    /// Empty registry; every lookup yields the unsupported stand-in.
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in backend.
    pub fn with_defaults(context: BackendContext) -> Self {
        let mut registry = Self::new(context);
        for kind in BackendKind::ALL {
            registry
                .constructors
                .insert(kind.key().to_string(), builtin(kind));
        }
        registry
    }

    /// Add `key`, replacing any earlier constructor under the same key.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F)
    where
        F: Fn(&BackendContext) -> Displayer + Send + Sync + 'static,
    {
        let key = key.into();
        if self
            .constructors
            .insert(key.clone(), Box::new(constructor))
            .is_some()
        {
            log::debug!("Replaced image display method {:?}", key);
        }
    }

    /// A fresh backend for `key`. Unknown keys give a backend whose every
    /// operation fails with `Unsupported`.
    pub fn get(&self, key: &str) -> Displayer {
        match self.constructors.get(key) {
            Some(constructor) => constructor(&self.context),
            None => Displayer::Unsupported(UnsupportedDisplayer::new(key)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn context(&self) -> &BackendContext {
        &self.context
    }
}

fn builtin(kind: BackendKind) -> Constructor {
    match kind {
        BackendKind::Kitty => {
            Box::new(|ctx: &BackendContext| Displayer::Kitty(KittyDisplayer::new(ctx)))
        }
        BackendKind::Sixel => {
            Box::new(|ctx: &BackendContext| Displayer::Sixel(SixelDisplayer::new(ctx)))
        }
        BackendKind::ITerm2 => {
            Box::new(|ctx: &BackendContext| Displayer::ITerm2(ITerm2Displayer::new(ctx)))
        }
        BackendKind::Urxvt => Box::new(|ctx: &BackendContext| {
            Displayer::Urxvt(UrxvtDisplayer::new(ctx, UrxvtLayout::Pane))
        }),
        BackendKind::UrxvtFullscreen => Box::new(|ctx: &BackendContext| {
            Displayer::UrxvtFullscreen(UrxvtDisplayer::new(ctx, UrxvtLayout::Fullscreen))
        }),
        BackendKind::Terminology => Box::new(|ctx: &BackendContext| {
            Displayer::Terminology(TerminologyDisplayer::new(ctx))
        }),
        BackendKind::W3m => Box::new(|ctx: &BackendContext| Displayer::W3m(W3mDisplayer::new(ctx))),
        BackendKind::Ueberzug => Box::new(|ctx: &BackendContext| {
            Displayer::Ueberzug(UeberzugDisplayer::new(ctx))
        }),
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

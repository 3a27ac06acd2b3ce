use derivative::Derivative;

/// How records with equal keys from different sources are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Lower source index first.
    #[default]
    SourceIndex,
    /// Whichever record entered the heap first.
    InsertionOrder,
}

/// What to do when a source yields a key lower than its previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderCheck {
    Off,
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct MergeConfig {
    // name used for the tracing span of a merge
    #[derivative(Default(value = "String::from(\"log-merge\")"))]
    pub(crate) name: String,
    pub(crate) tie_break: TieBreak,
    pub(crate) order_check: OrderCheck,
    // log progress every n emitted records, 0 disables
    #[derivative(Default(value = "100000"))]
    pub(crate) progress_interval: usize,
}

impl MergeConfig {
    pub fn builder() -> MergeConfigBuilder {
        MergeConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn order_check(&self) -> OrderCheck {
        self.order_check
    }

    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeConfigBuilder {
    config: MergeConfig,
}

impl MergeConfigBuilder {
    pub fn new() -> Self {
        MergeConfigBuilder {
            config: MergeConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.config.tie_break = tie_break;
        self
    }

    pub fn with_order_check(mut self, order_check: OrderCheck) -> Self {
        self.config.order_check = order_check;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.config.progress_interval = progress_interval;
        self
    }

    pub fn build(self) -> MergeConfig {
        self.config
    }
}

impl From<MergeConfigBuilder> for MergeConfig {
    fn from(builder: MergeConfigBuilder) -> Self {
        builder.build()
    }
}

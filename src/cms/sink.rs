use crate::api::CmsError;

/// Where a write can land, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum Sink {
    LocalCache,
    RemoteStore,
    ServerFallback,
}

impl Sink {
    pub fn is_remote(self) -> bool {
        !matches!(self, Sink::LocalCache)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SinkOutcome {
    pub sink: Sink,
    pub result: Result<(), CmsError>,
}

/// What a component shows after a save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SaveStatus {
    /// At least one remote sink accepted the value.
    Saved,
    /// Only this browser has the value.
    LocalOnly,
    /// Nothing accepted the value.
    Failed,
}

/// Per-sink results of one save, in the order the sinks were tried.
#[derive(Clone, Debug, Default)]
pub(crate) struct WriteReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl WriteReport {
    pub fn record(&mut self, sink: Sink, result: Result<(), CmsError>) {
        self.outcomes.push(SinkOutcome { sink, result });
    }

    pub fn outcome(&self, sink: Sink) -> Option<&SinkOutcome> {
        self.outcomes.iter().find(|o| o.sink == sink)
    }

    pub fn attempted(&self, sink: Sink) -> bool {
        self.outcome(sink).is_some()
    }

    pub fn local_ok(&self) -> bool {
        self.outcome(Sink::LocalCache)
            .map(|o| o.result.is_ok())
            .unwrap_or(false)
    }

    pub fn remote_ok(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.sink.is_remote() && o.result.is_ok())
    }

    /// The most authoritative sink that holds the value.
    pub fn last_success(&self) -> Option<Sink> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.result.is_ok())
            .map(|o| o.sink)
    }

    pub fn last_error(&self) -> Option<&CmsError> {
        self.outcomes
            .iter()
            .rev()
            .find_map(|o| o.result.as_ref().err())
    }

    pub fn status(&self) -> SaveStatus {
        if self.remote_ok() {
            SaveStatus::Saved
        } else if self.local_ok() {
            SaveStatus::LocalOnly
        } else {
            SaveStatus::Failed
        }
    }
}

/// Progress sink for long-running passes.
///
/// Wraps an optional caller closure. Reported values are clamped to
/// `0..=100` and never go backwards; a report lower than the last one is
/// dropped. Progress is observational only and has no effect on results.
pub struct Progress<'a> {
    sink: Option<&'a mut dyn FnMut(u8)>,
    last: Option<u8>,
}

impl<'a> Progress<'a> {
    /// Forward reports to `sink`.
    pub fn new(sink: &'a mut dyn FnMut(u8)) -> Self {
        Self {
            sink: Some(sink),
            last: None,
        }
    }

    /// A progress handle that discards every report.
    pub fn none() -> Self {
        Self {
            sink: None,
            last: None,
        }
    }

    /// Report `percent`.
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent < last) {
            return;
        }
        self.last = Some(percent);
        if let Some(sink) = self.sink.as_deref_mut() {
            sink(percent);
        }
    }

    /// Report completion.
    pub fn finish(&mut self) {
        self.report(100);
    }

    /// Last value reported, if any.
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::none()
    }
}

use super::*;

/// Trailing-edge debounce on the page clock: the action runs once, `wait_ms`
/// after the most recent [`Debouncer::call`].
#[derive(Clone)]
pub struct Debouncer {
    label: String,
    wait_ms: i64,
    action: Rc<dyn Fn(&mut Page) -> Result<()>>,
    pending: Rc<Cell<Option<i64>>>,
}

impl Debouncer {
    pub fn new<F>(label: &str, wait_ms: i64, action: F) -> Result<Self>
    where
        F: Fn(&mut Page) -> Result<()> + 'static,
    {
        if wait_ms < 0 {
            return Err(Error::InvalidConfig(format!(
                "debounce wait must not be negative, got {wait_ms}"
            )));
        }
        Ok(Self {
            label: label.to_string(),
            wait_ms,
            action: Rc::new(action),
            pending: Rc::new(Cell::new(None)),
        })
    }

    pub fn call(&self, page: &mut Page) {
        if let Some(previous) = self.pending.take() {
            page.clear_timeout(previous);
        }
        let action = Rc::clone(&self.action);
        let pending = Rc::clone(&self.pending);
        let id = page.set_timeout(&self.label, self.wait_ms, move |page| {
            pending.set(None);
            action(page)
        });
        self.pending.set(Some(id));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    pub fn cancel(&self, page: &mut Page) -> bool {
        match self.pending.take() {
            Some(id) => page.clear_timeout(id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_collapse_into_one_trailing_call() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        let debouncer = Debouncer::new("debounce", 100, move |page| {
            sink.borrow_mut().push(page.now_ms());
            Ok(())
        })?;

        debouncer.call(&mut page);
        page.advance_time(60)?;
        debouncer.call(&mut page);
        page.advance_time(60)?;
        assert!(hits.borrow().is_empty());
        assert!(debouncer.is_pending());

        page.advance_time(40)?;
        assert_eq!(*hits.borrow(), vec![160]);
        assert!(!debouncer.is_pending());
        Ok(())
    }

    #[test]
    fn cancel_drops_the_pending_call() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let debouncer = Debouncer::new("debounce", 10, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })?;
        debouncer.call(&mut page);
        assert!(debouncer.cancel(&mut page));
        assert!(!debouncer.cancel(&mut page));
        page.flush()?;
        assert_eq!(hits.get(), 0);
        assert!(Debouncer::new("bad", -1, |_| Ok(())).is_err());
        Ok(())
    }
}

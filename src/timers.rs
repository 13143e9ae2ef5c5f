use super::*;

pub(crate) type TimerTask = Box<dyn FnOnce(&mut Page) -> Result<()>>;

pub(crate) struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    label: String,
    task: TimerTask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
    pub label: String,
}

impl Page {
    /// Schedules a one-shot task `delay_ms` after the current virtual time.
    /// Negative delays run as soon as the clock is next advanced.
    pub fn set_timeout<F>(&mut self, label: &str, delay_ms: i64, task: F) -> i64
    where
        F: FnOnce(&mut Page) -> Result<()> + 'static,
    {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            label: label.to_string(),
            task: Box::new(task),
        });
        self.trace_timer_line(format!(
            "[timer] schedule id={id} label={label} due_at={due_at} delay_ms={delay_ms}"
        ));
        id
    }

    pub fn clear_timeout(&mut self, timer_id: i64) -> bool {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != timer_id);
        let cleared = self.task_queue.len() != before;
        if cleared {
            self.trace_timer_line(format!("[timer] clear id={timer_id}"));
        }
        cleared
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.task_queue.len();
        self.task_queue.clear();
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                label: task.label.clone(),
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    /// Moves the clock forward by `delta_ms`, running every task that falls
    /// due inside the window, including tasks scheduled by those tasks.
    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms;
        let target = self.now_ms.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(target))?;
        self.now_ms = target;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={target} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        self.advance_time(target_ms - self.now_ms)
    }

    /// Runs tasks until the queue is empty, moving the clock to each due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.now_ms;
        let ran = self.run_timer_queue(None)?;
        self.trace_timer_line(format!(
            "[timer] flush from={from} to={} ran={ran}",
            self.now_ms
        ));
        Ok(())
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(next_idx) = self.next_task_index(None) else {
            self.trace_timer_line("[timer] run_next none".into());
            return Ok(false);
        };

        let task = self.task_queue.remove(next_idx);
        if task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        self.execute_timer_task(task)?;
        Ok(true)
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.now_ms))?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={ran}",
            self.now_ms
        ));
        Ok(ran)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let task = self.task_queue.remove(next_idx);
            if task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());

        let next_task_desc = self
            .next_task_index(due_limit)
            .and_then(|idx| self.task_queue.get(idx))
            .map(|task| {
                format!(
                    "id={},label={},due_at={},order={}",
                    task.id, task.label, task.due_at, task.order
                )
            })
            .unwrap_or_else(|| "none".into());

        Error::Runtime(format!(
            "timer queue exceeded max task steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task={next_task_desc}",
            self.timer_step_limit,
            self.now_ms,
            self.task_queue.len(),
        ))
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        let ScheduledTask {
            id,
            due_at,
            label,
            task,
            ..
        } = task;
        self.trace_timer_line(format!(
            "[timer] run id={id} label={label} due_at={due_at} now_ms={}",
            self.now_ms
        ));
        task(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_time_runs_tasks_in_due_order() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let order = Rc::new(RefCell::new(Vec::new()));
        for (label, delay) in [("late", 50), ("early", 10), ("same-early", 10)] {
            let order = Rc::clone(&order);
            page.set_timeout(label, delay, move |page| {
                order.borrow_mut().push((label, page.now_ms()));
                Ok(())
            });
        }

        page.advance_time(20)?;
        assert_eq!(*order.borrow(), vec![("early", 10), ("same-early", 10)]);
        assert_eq!(page.now_ms(), 20);

        page.advance_time(30)?;
        assert_eq!(order.borrow().last(), Some(&("late", 50)));
        assert!(page.pending_timers().is_empty());
        Ok(())
    }

    #[test]
    fn chained_tasks_inside_the_window_all_run() -> Result<()> {
        fn tick(page: &mut Page, hits: Rc<Cell<u32>>) -> Result<()> {
            hits.set(hits.get() + 1);
            if hits.get() < 5 {
                page.set_timeout("tick", 10, move |page| tick(page, hits));
            }
            Ok(())
        }

        let mut page = Page::from_html("<body></body>")?;
        let hits = Rc::new(Cell::new(0));
        let first = Rc::clone(&hits);
        page.set_timeout("tick", 10, move |page| tick(page, first));

        page.advance_time(35)?;
        assert_eq!(hits.get(), 3);
        page.flush()?;
        assert_eq!(hits.get(), 5);
        assert_eq!(page.now_ms(), 50);
        Ok(())
    }

    #[test]
    fn cleared_timers_never_run() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = page.set_timeout("once", 5, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert!(page.clear_timeout(id));
        assert!(!page.clear_timeout(id));
        page.flush()?;
        assert_eq!(hits.get(), 0);
        Ok(())
    }

    #[test]
    fn step_limit_stops_runaway_chains() -> Result<()> {
        fn forever(page: &mut Page) -> Result<()> {
            page.set_timeout("forever", 1, forever);
            Ok(())
        }

        let mut page = Page::from_html("<body></body>")?;
        page.set_timer_step_limit(20)?;
        page.set_timeout("forever", 1, forever);
        match page.flush() {
            Err(Error::Runtime(message)) => {
                assert!(message.contains("limit=20"), "unexpected message: {message}");
                assert!(message.contains("label=forever"), "unexpected message: {message}");
            }
            other => panic!("expected step limit error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn rejects_time_travel() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        page.advance_time(10)?;
        assert!(page.advance_time(-1).is_err());
        assert!(page.advance_time_to(5).is_err());
        page.advance_time_to(10)?;
        assert!(!page.run_next_timer()?);
        assert_eq!(page.run_due_timers()?, 0);
        Ok(())
    }
}

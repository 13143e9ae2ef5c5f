use super::*;

use crate::timers::ScheduledTask;
use crate::viewport::ViewportState;

/// Event listener callback. Listeners receive the page they run on, so a
/// handler can query and mutate the document, schedule timers and scroll.
pub type Handler = Rc<dyn Fn(&mut Page, &mut Event) -> Result<()>>;

#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

#[derive(Default, Clone)]
struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Handler>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, handler: Handler) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(handler);
    }

    fn get(&self, node_id: NodeId, event: &str) -> Vec<Handler> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }

    fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// The page runtime: document, listeners, virtual clock and viewport.
///
/// The document node doubles as the window: `DOMContentLoaded`, `load` and
/// `scroll` are dispatched on it.
pub struct Page {
    pub(crate) dom: Dom,
    listeners: ListenerStore,
    active_element: Option<NodeId>,
    loaded: bool,
    location_hash: String,
    native_submissions: usize,
    pub(crate) task_queue: Vec<ScheduledTask>,
    pub(crate) now_ms: i64,
    pub(crate) timer_step_limit: usize,
    pub(crate) next_timer_id: i64,
    pub(crate) next_task_order: i64,
    pub(crate) viewport: ViewportState,
    trace: bool,
    trace_events: bool,
    trace_timers: bool,
    trace_scroll: bool,
    trace_behaviors: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            active_element: None,
            loaded: false,
            location_hash: String::new(),
            native_submissions: 0,
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            viewport: ViewportState::default(),
            trace: false,
            trace_events: true,
            trace_timers: true,
            trace_scroll: true,
            trace_behaviors: true,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        })
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_timers = enabled;
    }

    pub fn set_trace_scroll(&mut self, enabled: bool) {
        self.trace_scroll = enabled;
    }

    pub fn set_trace_behaviors(&mut self, enabled: bool) {
        self.trace_behaviors = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        if self.trace_logs.len() > self.trace_log_limit {
            let excess = self.trace_logs.len() - self.trace_log_limit;
            self.trace_logs.drain(..excess);
        }
        Ok(())
    }

    /// Fires `DOMContentLoaded` and then `load`. Later calls do nothing.
    pub fn finish_loading(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.loaded = true;
        let root = self.dom.root;
        self.dispatch_event(root, "DOMContentLoaded")?;
        self.dispatch_event(root, "load")?;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn document(&self) -> NodeId {
        self.dom.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.dom.body()
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)?;
        stacker::grow(32 * 1024 * 1024, || self.dispatch_event(target, "input"))?;
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(32 * 1024 * 1024, || self.click_node(target))
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(32 * 1024 * 1024, || self.focus_node(target))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(32 * 1024 * 1024, || self.blur_node(target))
    }

    /// Requests submission of the form matched by `selector`, or of the form
    /// owning the matched control.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = if self.dom.is_tag(target, "form") {
            Some(target)
        } else {
            self.dom.closest(target, "form")?
        };
        match form {
            Some(form) => stacker::grow(32 * 1024 * 1024, || self.submit_form(form)),
            None => Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form or form control".into(),
                actual: self.dom.tag_name(target).unwrap_or_default().to_string(),
            }),
        }
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(32 * 1024 * 1024, || self.dispatch_event(target, event))?;
        Ok(())
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Fragment of the last same-page navigation that was not intercepted.
    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }

    /// Number of form submissions that reached the browser default.
    pub fn native_submission_count(&self) -> usize {
        self.native_submissions
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.listeners.count(node, event)
    }

    pub fn add_event_listener(&mut self, node: NodeId, event: &str, handler: Handler) {
        self.listeners.add(node, event.to_string(), handler);
    }

    pub fn on<F>(&mut self, node: NodeId, event: &str, handler: F)
    where
        F: Fn(&mut Page, &mut Event) -> Result<()> + 'static,
    {
        self.add_event_listener(node, event, Rc::new(handler));
    }

    pub fn node_has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.dom.class_contains(node, class_name)
    }

    pub fn node_add_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_add(node, class_name)
    }

    pub fn node_remove_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_remove(node, class_name)
    }

    pub fn node_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn node_set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn node_remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn node_set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.dom.style_set(node, property, value)
    }

    pub fn node_closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.dom.closest(node, selector)
    }

    pub fn node_remove(&mut self, node: NodeId) -> Result<()> {
        self.dom.remove_node(node)
    }

    pub fn node_is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual.trim() != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("has_class({class_name})={expected}"),
                format!("has_class({class_name})={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("{name}={expected:?}"),
                format!("{name}={actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_disabled(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.disabled(target);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("disabled={expected}"),
                format!("disabled={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_absent(&self, selector: &str) -> Result<()> {
        if let Some(found) = self.dom.query_selector(selector)? {
            return Err(self.assertion_failed(selector, found, "no match", "present".into()));
        }
        Ok(())
    }

    pub fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.dom.query_selector_all(selector)?.len())
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target).trim().to_string())
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn assertion_failed(
        &self,
        selector: &str,
        target: NodeId,
        expected: &str,
        actual: String,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: truncate_chars(&self.dom.dump_node(target), 200),
        }
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }

        let outcome = self.dispatch_event(target, "click")?;
        if outcome.default_prevented {
            return Ok(());
        }

        if let Some(anchor) = self.dom.closest(target, "a[href]")? {
            let href = self.dom.attr(anchor, "href").unwrap_or_default();
            if let Some(fragment) = href.strip_prefix('#') {
                self.follow_fragment(fragment)?;
            }
        }

        if is_submit_control(&self.dom, target) {
            if let Some(form) = self.dom.closest(target, "form")? {
                self.submit_form(form)?;
            }
        }

        Ok(())
    }

    fn follow_fragment(&mut self, fragment: &str) -> Result<()> {
        self.location_hash = format!("#{fragment}");
        if let Some(node) = self.dom.by_id(fragment) {
            self.scroll_into_view(node, ScrollBehavior::Instant)?;
        }
        Ok(())
    }

    fn submit_form(&mut self, form: NodeId) -> Result<()> {
        let outcome = self.dispatch_event(form, "submit")?;
        if !outcome.default_prevented {
            self.native_submissions += 1;
            self.trace_event_line(format!(
                "[event] native submit form={}",
                self.trace_node_label(form)
            ));
        }
        Ok(())
    }

    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<Event> {
        let mut event = Event::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        for (depth, node) in path.iter().enumerate() {
            if depth > 0 && !bubbles(event_type) {
                break;
            }
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.disabled(node) {
            return Ok(());
        }

        if self.active_element == Some(node) {
            return Ok(());
        }

        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }

        self.active_element = Some(node);
        self.dispatch_event(node, "focusin")?;
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }

        self.dispatch_event(node, "focusout")?;
        self.dispatch_event(node, "blur")?;
        self.active_element = None;
        Ok(())
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &mut Event) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type);
        for handler in listeners {
            if self.trace && self.trace_events {
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} default_prevented={}",
                    event.event_type, target_label, current_label, event.default_prevented
                ));
            }
            handler(self, event)?;
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !(self.trace && self.trace_events) {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        self.trace_event_line(format!(
            "[event] done {} target={} outcome={} default_prevented={}",
            event.event_type, target_label, outcome, event.default_prevented
        ));
    }

    pub(crate) fn trace_node_label(&self, node: NodeId) -> String {
        if node == self.dom.root {
            return "document".into();
        }
        let Some(element) = self.dom.element(node) else {
            return "#text".into();
        };
        let mut label = element.tag_name.clone();
        if let Some(id) = element.attrs.get("id") {
            label.push('#');
            label.push_str(id);
        } else if let Some(class) = element.attrs.get("class") {
            for token in class.split_whitespace() {
                label.push('.');
                label.push_str(token);
            }
        }
        label
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace && self.trace_events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace && self.trace_timers {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_scroll_line(&mut self, line: String) {
        if self.trace && self.trace_scroll {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_behavior_line(&mut self, line: String) {
        if self.trace && self.trace_behaviors {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        if self.trace_logs.len() >= self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        self.trace_logs.push(line);
    }
}

fn bubbles(event_type: &str) -> bool {
    !matches!(event_type, "focus" | "blur" | "load" | "scroll")
}

fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("button") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }

    if element.tag_name.eq_ignore_ascii_case("input") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(false);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_bubble_from_target_to_document() -> Result<()> {
        let mut page = Page::from_html("<div id='outer'><button id='inner'>x</button></div>")?;
        let seen = Rc::new(RefCell::new(Vec::new()));
        let outer = page.select_one("#outer")?;
        let inner = page.select_one("#inner")?;
        let document = page.document();

        for (node, label) in [(inner, "inner"), (outer, "outer"), (document, "document")] {
            let seen = Rc::clone(&seen);
            page.on(node, "click", move |_, _| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }

        page.click("#inner")?;
        assert_eq!(*seen.borrow(), vec!["inner", "outer", "document"]);
        Ok(())
    }

    #[test]
    fn stop_propagation_keeps_ancestors_quiet() -> Result<()> {
        let mut page = Page::from_html("<div id='outer'><button id='inner'>x</button></div>")?;
        let hits = Rc::new(Cell::new(0));
        let outer = page.select_one("#outer")?;
        let inner = page.select_one("#inner")?;
        page.on(inner, "click", |_, event| {
            event.stop_propagation();
            Ok(())
        });
        let counter = Rc::clone(&hits);
        page.on(outer, "click", move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        page.click("#inner")?;
        assert_eq!(hits.get(), 0);
        Ok(())
    }

    #[test]
    fn blur_only_fires_for_the_focused_element() -> Result<()> {
        let mut page = Page::from_html("<input id='a'><input id='b'>")?;
        let blurs = Rc::new(RefCell::new(Vec::new()));
        for id in ["a", "b"] {
            let node = page.select_one(&format!("#{id}"))?;
            let blurs = Rc::clone(&blurs);
            page.on(node, "blur", move |_, _| {
                blurs.borrow_mut().push(id);
                Ok(())
            });
        }

        page.blur("#a")?;
        assert!(blurs.borrow().is_empty());

        page.focus("#a")?;
        page.focus("#b")?;
        page.blur("#b")?;
        assert_eq!(*blurs.borrow(), vec!["a", "b"]);
        assert_eq!(page.active_element(), None);
        Ok(())
    }

    #[test]
    fn submit_button_click_reaches_native_submission_unless_prevented() -> Result<()> {
        let mut page = Page::from_html(
            "<form id='f'><input id='name'><button type='submit'>Send</button></form>",
        )?;
        page.click("button")?;
        assert_eq!(page.native_submission_count(), 1);

        let form = page.select_one("#f")?;
        page.on(form, "submit", |_, event| {
            event.prevent_default();
            Ok(())
        });
        page.click("button")?;
        page.submit("#name")?;
        assert_eq!(page.native_submission_count(), 1);
        Ok(())
    }

    #[test]
    fn disabled_controls_ignore_clicks() -> Result<()> {
        let mut page = Page::from_html("<button id='b' disabled>x</button>")?;
        let hits = Rc::new(Cell::new(0));
        let button = page.select_one("#b")?;
        let counter = Rc::clone(&hits);
        page.on(button, "click", move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        page.click("#b")?;
        assert_eq!(hits.get(), 0);
        Ok(())
    }

    #[test]
    fn fragment_links_update_location_when_not_intercepted() -> Result<()> {
        let mut page = Page::from_html("<a id='go' href='#about'>About</a><section id='about'></section>")?;
        page.click("#go")?;
        assert_eq!(page.location_hash(), "#about");
        Ok(())
    }

    #[test]
    fn finish_loading_fires_content_loaded_then_load_once() -> Result<()> {
        let mut page = Page::from_html("<body></body>")?;
        let order = Rc::new(RefCell::new(Vec::new()));
        let document = page.document();
        for event in ["DOMContentLoaded", "load"] {
            let order = Rc::clone(&order);
            page.on(document, event, move |_, e| {
                order.borrow_mut().push(e.event_type().to_string());
                Ok(())
            });
        }
        page.finish_loading()?;
        page.finish_loading()?;
        assert_eq!(*order.borrow(), vec!["DOMContentLoaded", "load"]);
        Ok(())
    }

    #[test]
    fn type_text_rejects_non_text_controls() -> Result<()> {
        let mut page = Page::from_html("<div id='d'></div>")?;
        match page.type_text("#d", "x") {
            Err(Error::TypeMismatch { actual, .. }) => assert_eq!(actual, "div"),
            other => panic!("expected type mismatch, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn trace_log_is_bounded() -> Result<()> {
        let mut page = Page::from_html("<button id='b'>x</button>")?;
        page.enable_trace(true);
        page.set_trace_stderr(false);
        page.set_trace_log_limit(2)?;
        page.click("#b")?;
        page.click("#b")?;
        page.click("#b")?;
        let logs = page.take_trace_logs();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|line| line.starts_with("[event]")));
        assert!(page.set_trace_log_limit(0).is_err());
        Ok(())
    }
}

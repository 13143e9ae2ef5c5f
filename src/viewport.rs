use super::*;

const DEFAULT_VIEWPORT_HEIGHT: i64 = 800;
const SMOOTH_SCROLL_DURATION_MS: i64 = 300;
const SCROLL_FRAME_MS: i64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// A programmatic scroll of the window, as requested (after clamping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub top: i64,
    pub behavior: ScrollBehavior,
}

/// Vertical placement of an element in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutBox {
    pub top: i64,
    pub height: i64,
}

impl LayoutBox {
    pub fn bottom(&self) -> i64 {
        self.top.saturating_add(self.height.max(0))
    }
}

/// Grows (positive) or shrinks (negative) the viewport before intersections
/// are computed, in CSS `margin` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RootMargin {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl RootMargin {
    /// Parses the CSS shorthand with one to four pixel lengths,
    /// e.g. `"0px 0px -50px 0px"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let values = raw
            .split_whitespace()
            .map(|token| parse_px(token).ok_or_else(|| invalid_margin(raw)))
            .collect::<Result<Vec<_>>>()?;
        let [top, right, bottom, left] = match values.as_slice() {
            [all] => [*all; 4],
            [vertical, horizontal] => [*vertical, *horizontal, *vertical, *horizontal],
            [top, horizontal, bottom] => [*top, *horizontal, *bottom, *horizontal],
            [top, right, bottom, left] => [*top, *right, *bottom, *left],
            _ => return Err(invalid_margin(raw)),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

fn parse_px(token: &str) -> Option<i64> {
    let number = token.strip_suffix("px").unwrap_or(token);
    if number != token || number == "0" || number == "-0" {
        number.parse::<i64>().ok()
    } else {
        None
    }
}

fn invalid_margin(raw: &str) -> Error {
    Error::InvalidConfig(format!("root margin must be 1-4 pixel lengths: {raw:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionOptions {
    /// Visible fraction of the target at which it counts as intersecting.
    pub threshold: f64,
    pub root_margin: RootMargin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

pub type IntersectionCallback = Rc<dyn Fn(&mut Page, &[IntersectionEntry]) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

pub(crate) struct IntersectionObserver {
    options: IntersectionOptions,
    callback: IntersectionCallback,
    // None until the first notification for that target.
    targets: Vec<(NodeId, Option<bool>)>,
}

pub(crate) struct ViewportState {
    height: i64,
    document_height: Option<i64>,
    scroll_y: i64,
    layout: HashMap<NodeId, LayoutBox>,
    scroll_requests: Vec<ScrollRequest>,
    scroll_animation: Option<i64>,
    observers: Vec<IntersectionObserver>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            height: DEFAULT_VIEWPORT_HEIGHT,
            document_height: None,
            scroll_y: 0,
            layout: HashMap::new(),
            scroll_requests: Vec::new(),
            scroll_animation: None,
            observers: Vec::new(),
        }
    }
}

impl Page {
    pub fn viewport_height(&self) -> i64 {
        self.viewport.height
    }

    pub fn set_viewport_height(&mut self, height: i64) -> Result<()> {
        if height <= 0 {
            return Err(Error::Runtime(format!(
                "viewport height must be positive, got {height}"
            )));
        }
        self.viewport.height = height;
        self.settle_scroll_position()?;
        self.refresh_intersections()
    }

    /// Total scrollable height: the explicit document height if set, else
    /// the lowest layout box, never less than the viewport.
    pub fn document_height(&self) -> i64 {
        let from_layout = self
            .viewport
            .layout
            .values()
            .map(LayoutBox::bottom)
            .max()
            .unwrap_or(0);
        self.viewport
            .document_height
            .unwrap_or(from_layout)
            .max(self.viewport.height)
    }

    pub fn set_document_height(&mut self, height: i64) -> Result<()> {
        if height < 0 {
            return Err(Error::Runtime(format!(
                "document height must not be negative, got {height}"
            )));
        }
        self.viewport.document_height = Some(height);
        self.settle_scroll_position()
    }

    pub fn set_layout(&mut self, selector: &str, top: i64, height: i64) -> Result<()> {
        let node = self.select_one(selector)?;
        self.set_node_layout(node, LayoutBox { top, height })
    }

    pub fn set_node_layout(&mut self, node: NodeId, layout: LayoutBox) -> Result<()> {
        if layout.height < 0 {
            return Err(Error::Runtime(format!(
                "layout height must not be negative, got {}",
                layout.height
            )));
        }
        self.viewport.layout.insert(node, layout);
        self.refresh_intersections()
    }

    /// Elements without an explicit layout sit at the top with zero height.
    pub fn layout_of(&self, node: NodeId) -> LayoutBox {
        self.viewport.layout.get(&node).copied().unwrap_or_default()
    }

    pub fn scroll_y(&self) -> i64 {
        self.viewport.scroll_y
    }

    pub fn max_scroll_y(&self) -> i64 {
        (self.document_height() - self.viewport.height).max(0)
    }

    pub fn scroll_requests(&self) -> &[ScrollRequest] {
        &self.viewport.scroll_requests
    }

    pub fn is_scroll_animating(&self) -> bool {
        self.viewport.scroll_animation.is_some()
    }

    /// User scroll: jumps to `y` (clamped), interrupting any smooth scroll.
    pub fn scroll_to(&mut self, y: i64) -> Result<()> {
        self.cancel_scroll_animation();
        let target = self.clamp_scroll(y);
        stacker::grow(32 * 1024 * 1024, || self.apply_scroll(target))
    }

    /// Programmatic window scroll, recorded in [`Page::scroll_requests`].
    pub fn window_scroll_to(&mut self, top: i64, behavior: ScrollBehavior) -> Result<()> {
        let target = self.clamp_scroll(top);
        self.viewport.scroll_requests.push(ScrollRequest {
            top: target,
            behavior,
        });
        self.trace_scroll_line(format!(
            "[scroll] request top={target} behavior={behavior:?} from={}",
            self.viewport.scroll_y
        ));
        self.cancel_scroll_animation();
        match behavior {
            ScrollBehavior::Instant => self.apply_scroll(target),
            ScrollBehavior::Smooth => {
                let from = self.viewport.scroll_y;
                if from != target {
                    self.schedule_scroll_frame(from, target, self.now_ms);
                }
                Ok(())
            }
        }
    }

    /// Aligns the top edge of `node` with the top of the viewport.
    pub fn scroll_into_view(&mut self, node: NodeId, behavior: ScrollBehavior) -> Result<()> {
        let top = self.layout_of(node).top;
        self.window_scroll_to(top, behavior)
    }

    pub fn create_intersection_observer(
        &mut self,
        options: IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<ObserverId> {
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(Error::Runtime(format!(
                "intersection threshold must be within 0..=1, got {}",
                options.threshold
            )));
        }
        self.viewport.observers.push(IntersectionObserver {
            options,
            callback,
            targets: Vec::new(),
        });
        Ok(ObserverId(self.viewport.observers.len() - 1))
    }

    /// Starts watching `node`; the first notification for it is delivered
    /// immediately.
    pub fn observe(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        let entry = self
            .viewport
            .observers
            .get_mut(observer.0)
            .ok_or_else(|| Error::Runtime(format!("unknown intersection observer {}", observer.0)))?;
        if !entry.targets.iter().any(|(target, _)| *target == node) {
            entry.targets.push((node, None));
        }
        self.refresh_intersections()
    }

    pub fn observed_count(&self, observer: ObserverId) -> usize {
        self.viewport
            .observers
            .get(observer.0)
            .map(|entry| entry.targets.len())
            .unwrap_or(0)
    }

    /// Delivers entries for every observed target whose intersecting state
    /// changed since its last notification.
    pub fn refresh_intersections(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.viewport.observers.len() {
            let (entries, callback) = {
                let root = self.intersection_root(&self.viewport.observers[index].options);
                let threshold = self.viewport.observers[index].options.threshold;
                let measured = self.viewport.observers[index]
                    .targets
                    .iter()
                    .map(|(node, last)| {
                        let ratio = self.intersection_ratio(*node, root);
                        (*node, *last, ratio)
                    })
                    .collect::<Vec<_>>();

                let observer = &mut self.viewport.observers[index];
                let mut entries = Vec::new();
                for (node, last, ratio) in measured {
                    let is_intersecting = ratio > 0.0 && ratio >= threshold;
                    if last != Some(is_intersecting) {
                        if let Some(slot) = observer.targets.iter_mut().find(|(t, _)| *t == node) {
                            slot.1 = Some(is_intersecting);
                        }
                        entries.push(IntersectionEntry {
                            target: node,
                            is_intersecting,
                            intersection_ratio: ratio,
                        });
                    }
                }
                (entries, Rc::clone(&observer.callback))
            };

            if !entries.is_empty() {
                self.trace_scroll_line(format!(
                    "[scroll] intersections observer={index} entries={} scroll_y={}",
                    entries.len(),
                    self.viewport.scroll_y
                ));
                callback(self, &entries)?;
            }
            index += 1;
        }
        Ok(())
    }

    fn intersection_root(&self, options: &IntersectionOptions) -> (i64, i64) {
        let top = self.viewport.scroll_y - options.root_margin.top;
        let bottom = self.viewport.scroll_y + self.viewport.height + options.root_margin.bottom;
        (top, bottom)
    }

    fn intersection_ratio(&self, node: NodeId, (root_top, root_bottom): (i64, i64)) -> f64 {
        if !self.dom.is_connected(node) || root_bottom < root_top {
            return 0.0;
        }
        let layout = self.layout_of(node);
        if layout.height == 0 {
            return if layout.top >= root_top && layout.top <= root_bottom {
                1.0
            } else {
                0.0
            };
        }
        let overlap = layout.bottom().min(root_bottom) - layout.top.max(root_top);
        if overlap <= 0 {
            0.0
        } else {
            overlap as f64 / layout.height as f64
        }
    }

    fn clamp_scroll(&self, y: i64) -> i64 {
        y.clamp(0, self.max_scroll_y())
    }

    fn settle_scroll_position(&mut self) -> Result<()> {
        let clamped = self.clamp_scroll(self.viewport.scroll_y);
        self.apply_scroll(clamped)
    }

    fn cancel_scroll_animation(&mut self) {
        if let Some(id) = self.viewport.scroll_animation.take() {
            self.clear_timeout(id);
        }
    }

    fn schedule_scroll_frame(&mut self, from: i64, to: i64, started_at: i64) {
        let id = self.set_timeout("scroll-frame", SCROLL_FRAME_MS, move |page| {
            page.viewport.scroll_animation = None;
            let elapsed = page.now_ms - started_at;
            let progress = (elapsed as f64 / SMOOTH_SCROLL_DURATION_MS as f64).min(1.0);
            let y = if progress >= 1.0 {
                to
            } else {
                from + ((to - from) as f64 * ease_in_out(progress)).round() as i64
            };
            page.apply_scroll(y)?;
            if progress < 1.0 && page.viewport.scroll_animation.is_none() {
                page.schedule_scroll_frame(from, to, started_at);
            }
            Ok(())
        });
        self.viewport.scroll_animation = Some(id);
    }

    fn apply_scroll(&mut self, y: i64) -> Result<()> {
        if y == self.viewport.scroll_y {
            return Ok(());
        }
        self.trace_scroll_line(format!(
            "[scroll] position from={} to={y}",
            self.viewport.scroll_y
        ));
        self.viewport.scroll_y = y;
        let root = self.dom.root;
        self.dispatch_event(root, "scroll")?;
        self.refresh_intersections()
    }
}

fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tall_page() -> Result<Page> {
        let mut page = Page::from_html(
            "<body><section id='top'></section><section id='far'></section></body>",
        )?;
        page.set_viewport_height(600)?;
        page.set_document_height(3000)?;
        page.set_layout("#far", 2000, 400)?;
        Ok(page)
    }

    #[test]
    fn root_margin_shorthand_expands_like_css() -> Result<()> {
        assert_eq!(
            RootMargin::parse("0px 0px -50px 0px")?,
            RootMargin {
                top: 0,
                right: 0,
                bottom: -50,
                left: 0
            }
        );
        assert_eq!(RootMargin::parse("10px")?.left, 10);
        assert_eq!(RootMargin::parse("5px 7px")?.right, 7);
        assert_eq!(RootMargin::parse("1px 2px 3px")?.left, 2);
        assert!(RootMargin::parse("").is_err());
        assert!(RootMargin::parse("10%").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
        Ok(())
    }

    #[test]
    fn user_scroll_is_clamped_and_fires_scroll_events() -> Result<()> {
        let mut page = tall_page()?;
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let document = page.document();
        page.on(document, "scroll", move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        page.scroll_to(10_000)?;
        assert_eq!(page.scroll_y(), 2400);
        page.scroll_to(2400)?;
        page.scroll_to(-5)?;
        assert_eq!(page.scroll_y(), 0);
        assert_eq!(hits.get(), 2);
        Ok(())
    }

    #[test]
    fn smooth_scroll_animates_over_several_frames() -> Result<()> {
        let mut page = tall_page()?;
        let far = page.select_one("#far")?;
        page.scroll_into_view(far, ScrollBehavior::Smooth)?;

        assert_eq!(page.scroll_y(), 0);
        assert!(page.is_scroll_animating());

        page.advance_time(SCROLL_FRAME_MS * 4)?;
        let midway = page.scroll_y();
        assert!(midway > 0 && midway < 2000, "unexpected midway position {midway}");

        page.advance_time(SMOOTH_SCROLL_DURATION_MS)?;
        assert_eq!(page.scroll_y(), 2000);
        assert!(!page.is_scroll_animating());
        assert_eq!(
            page.scroll_requests(),
            &[ScrollRequest {
                top: 2000,
                behavior: ScrollBehavior::Smooth
            }]
        );
        Ok(())
    }

    #[test]
    fn user_scroll_interrupts_smooth_scroll() -> Result<()> {
        let mut page = tall_page()?;
        page.window_scroll_to(2000, ScrollBehavior::Smooth)?;
        page.advance_time(SCROLL_FRAME_MS)?;
        page.scroll_to(100)?;
        page.flush()?;
        assert_eq!(page.scroll_y(), 100);
        Ok(())
    }

    #[test]
    fn observer_reports_threshold_crossings_once() -> Result<()> {
        let mut page = tall_page()?;
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let observer = page.create_intersection_observer(
            IntersectionOptions {
                threshold: 0.1,
                root_margin: RootMargin::parse("0px 0px -50px 0px")?,
            },
            Rc::new(move |_: &mut Page, entries: &[IntersectionEntry]| -> Result<()> {
                sink.borrow_mut()
                    .extend(entries.iter().map(|entry| entry.is_intersecting));
                Ok(())
            }),
        )?;
        let far = page.select_one("#far")?;
        page.observe(observer, far)?;
        assert_eq!(*seen.borrow(), vec![false]);

        // Root bottom is 1400 + 600 - 50 = 1950: the box is not visible yet.
        page.scroll_to(1400)?;
        assert_eq!(*seen.borrow(), vec![false]);

        // Root bottom 2030: 30px of 400 visible, still under 10%.
        page.scroll_to(1480)?;
        assert_eq!(*seen.borrow(), vec![false]);

        // Root bottom 2050: 50px of 400 = 12.5%.
        page.scroll_to(1500)?;
        assert_eq!(*seen.borrow(), vec![false, true]);

        page.scroll_to(1600)?;
        assert_eq!(*seen.borrow(), vec![false, true]);

        page.scroll_to(0)?;
        assert_eq!(*seen.borrow(), vec![false, true, false]);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_thresholds() -> Result<()> {
        let mut page = tall_page()?;
        let result = page.create_intersection_observer(
            IntersectionOptions {
                threshold: 1.5,
                root_margin: RootMargin::default(),
            },
            Rc::new(|_: &mut Page, _: &[IntersectionEntry]| -> Result<()> { Ok(()) }),
        );
        assert!(result.is_err());
        Ok(())
    }
}

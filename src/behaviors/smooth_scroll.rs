use super::*;

/// In-page anchors scroll to their target instead of jumping.
pub(super) fn setup(page: &mut Page, config: &SmoothScrollConfig) -> Result<Setup> {
    let behavior = config.behavior;
    for link in page.lookup_all(&config.anchor_selector)? {
        page.on(link, "click", move |page, event| {
            event.prevent_default();
            let href = page.node_attribute(link, "href").unwrap_or_default();
            let fragment = href.strip_prefix('#').unwrap_or(&href);
            match page.lookup_id(fragment) {
                Capability::Present(target) => {
                    page.trace_behavior_line(format!(
                        "[behavior] smooth_scroll target={href}"
                    ));
                    page.scroll_into_view(target, behavior)
                }
                Capability::Absent { selector } => {
                    page.trace_behavior_line(format!(
                        "[behavior] smooth_scroll missing={selector}"
                    ));
                    Ok(())
                }
            }
        });
    }
    Ok(Setup::Installed)
}

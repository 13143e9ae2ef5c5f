use super::*;

/// Floating control that appears once the page is scrolled down and takes
/// the reader back to the top.
pub(super) fn setup(page: &mut Page, config: &BackToTopConfig) -> Result<Setup> {
    if page.lookup(&config.control_selector)?.is_present() {
        return Ok(Setup::AlreadyPresent);
    }
    let Some(body) = page.body() else {
        return Ok(Setup::Skipped {
            missing: "body".into(),
        });
    };

    let control = page.dom.create_detached_element("button");
    page.dom.set_attr(control, "class", &config.control_class)?;
    page.dom.set_text_content(control, &config.label)?;
    page.dom.set_attr(control, "aria-label", &config.title)?;
    page.dom.set_attr(control, "title", &config.title)?;
    page.dom.append_child(body, control)?;

    let visible_class = config.visible_class.clone();
    let threshold = config.threshold_px;
    let update = move |page: &mut Page| -> Result<()> {
        let show = page.scroll_y() > threshold;
        if show == page.node_has_class(control, &visible_class) {
            return Ok(());
        }
        if show {
            page.node_add_class(control, &visible_class)?;
        } else {
            page.node_remove_class(control, &visible_class)?;
        }
        page.trace_behavior_line(format!(
            "[behavior] back_to_top visible={show} scroll_y={}",
            page.scroll_y()
        ));
        Ok(())
    };

    let document = page.document();
    match config.scroll_debounce_ms {
        Some(wait_ms) => {
            let debouncer = Debouncer::new("back-to-top-scroll", wait_ms, update)?;
            page.on(document, "scroll", move |page, _| {
                debouncer.call(page);
                Ok(())
            });
        }
        None => page.on(document, "scroll", move |page, _| update(page)),
    }

    page.on(control, "click", |page, _| {
        page.window_scroll_to(0, ScrollBehavior::Smooth)
    });

    Ok(Setup::Installed)
}

use super::*;

/// The UI widget library the page markup is written for.
///
/// Behaviors only ask it to show a modal; dismissing modals and alerts is
/// wired by [`UiToolkit::install`].
pub trait UiToolkit {
    fn install(&self, page: &mut Page) -> Result<()>;

    fn show_modal(&self, page: &mut Page, modal: NodeId) -> Result<()>;

    fn hide_modal(&self, page: &mut Page, modal: NodeId) -> Result<()>;
}

/// Bootstrap 5 flavoured modal and alert handling, without transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapToolkit;

impl UiToolkit for BootstrapToolkit {
    fn install(&self, page: &mut Page) -> Result<()> {
        let document = page.document();
        let toolkit = *self;
        page.on(document, "click", move |page, event| {
            let Some(trigger) = page.node_closest(event.target(), "[data-bs-dismiss]")? else {
                return Ok(());
            };
            match page.node_attribute(trigger, "data-bs-dismiss").as_deref() {
                Some("modal") => {
                    if let Some(modal) = page.node_closest(trigger, ".modal")? {
                        toolkit.hide_modal(page, modal)?;
                    }
                }
                Some("alert") => {
                    if let Some(alert) = page.node_closest(trigger, ".alert")? {
                        page.node_remove(alert)?;
                    }
                }
                _ => {}
            }
            Ok(())
        });
        Ok(())
    }

    fn show_modal(&self, page: &mut Page, modal: NodeId) -> Result<()> {
        page.node_add_class(modal, "show")?;
        page.node_set_style(modal, "display", "block")?;
        page.node_set_attribute(modal, "aria-modal", "true")?;
        page.node_set_attribute(modal, "role", "dialog")?;
        page.node_remove_attribute(modal, "aria-hidden")?;
        if let Some(body) = page.body() {
            page.node_add_class(body, "modal-open")?;
        }
        let label = page.trace_node_label(modal);
        page.trace_behavior_line(format!("[behavior] toolkit show_modal modal={label}"));
        Ok(())
    }

    fn hide_modal(&self, page: &mut Page, modal: NodeId) -> Result<()> {
        page.node_remove_class(modal, "show")?;
        page.node_set_style(modal, "display", "none")?;
        page.node_remove_attribute(modal, "aria-modal")?;
        page.node_remove_attribute(modal, "role")?;
        page.node_set_attribute(modal, "aria-hidden", "true")?;
        if let Some(body) = page.body() {
            page.node_remove_class(body, "modal-open")?;
        }
        let label = page.trace_node_label(modal);
        page.trace_behavior_line(format!("[behavior] toolkit hide_modal modal={label}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <body>
          <div class="modal fade" id="m" tabindex="-1">
            <div class="modal-dialog"><button class="btn-close" data-bs-dismiss="modal"></button></div>
          </div>
          <div class="alert alert-success" id="a">
            Done <button class="btn-close" data-bs-dismiss="alert"></button>
          </div>
        </body>
    "#;

    #[test]
    fn show_and_dismiss_modal() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        let toolkit = BootstrapToolkit;
        toolkit.install(&mut page)?;

        let modal = page.select_one("#m")?;
        toolkit.show_modal(&mut page, modal)?;
        page.assert_class("#m", "show", true)?;
        page.assert_attr("#m", "aria-modal", Some("true"))?;
        page.assert_class("body", "modal-open", true)?;

        page.click("#m .btn-close")?;
        page.assert_class("#m", "show", false)?;
        page.assert_attr("#m", "aria-hidden", Some("true"))?;
        page.assert_class("body", "modal-open", false)?;
        Ok(())
    }

    #[test]
    fn alert_dismiss_removes_the_alert() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        BootstrapToolkit.install(&mut page)?;
        page.click("#a .btn-close")?;
        page.assert_absent("#a")?;
        page.assert_exists("#m")?;
        Ok(())
    }
}

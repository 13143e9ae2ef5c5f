use super::*;

const MODAL_MARKUP: &str = r#"
    <div class="modal-dialog modal-dialog-centered modal-lg">
        <div class="modal-content">
            <div class="modal-header">
                <h5 class="modal-title">Imagem</h5>
                <button type="button" class="btn-close" data-bs-dismiss="modal"></button>
            </div>
            <div class="modal-body text-center">
                <img src="" alt="" class="img-fluid">
            </div>
        </div>
    </div>
"#;

/// Click-to-enlarge for the section images, shown in a shared modal.
pub(super) fn setup(
    page: &mut Page,
    config: &ImageModalConfig,
    services: &Services,
) -> Result<Setup> {
    let outcome = if page.lookup_id(&config.modal_id).is_present() {
        Setup::AlreadyPresent
    } else {
        let Some(body) = page.body() else {
            return Ok(Setup::Skipped {
                missing: "body".into(),
            });
        };
        let modal = page.dom.create_detached_element("div");
        page.dom.set_attr(modal, "class", "modal fade")?;
        page.dom.set_attr(modal, "id", &config.modal_id)?;
        page.dom.set_attr(modal, "tabindex", "-1")?;
        page.dom.set_inner_html(modal, MODAL_MARKUP)?;
        page.dom.append_child(body, modal)?;
        Setup::Installed
    };

    let config = Rc::new(config.clone());
    for image in page.lookup_all(&config.image_selector)? {
        page.node_set_style(image, "cursor", "pointer")?;
        let config = Rc::clone(&config);
        let toolkit = Rc::clone(&services.toolkit);
        page.on(image, "click", move |page, _| {
            enlarge(page, &config, toolkit.as_ref(), image)
        });
    }
    Ok(outcome)
}

fn enlarge(
    page: &mut Page,
    config: &ImageModalConfig,
    toolkit: &dyn UiToolkit,
    image: NodeId,
) -> Result<()> {
    // The modal is looked up per click: markup may replace it after setup.
    let Some(modal) = page.lookup_id(&config.modal_id).node() else {
        return Ok(());
    };
    let src = page.node_attribute(image, "src").unwrap_or_default();
    let alt = page.node_attribute(image, "alt").unwrap_or_default();

    if let Some(modal_image) = page.lookup_within(modal, &config.modal_image_selector)?.node() {
        page.node_set_attribute(modal_image, "src", &src)?;
        page.node_set_attribute(modal_image, "alt", &alt)?;
    }
    if let Some(title) = page.lookup_within(modal, &config.title_selector)?.node() {
        let text = if alt.is_empty() {
            config.fallback_title.as_str()
        } else {
            alt.as_str()
        };
        page.dom.set_text_content(title, text)?;
    }

    page.trace_behavior_line(format!("[behavior] image_modal open src={src}"));
    toolkit.show_modal(page, modal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <body>
          <section class="epita"><img id="campus" src="img/campus.jpg" alt="Campus"></section>
          <section class="cienc"><img id="lab" src="img/lab.jpg"></section>
          <section class="constru"><img id="plain" src="img/obra.jpg" alt="Obra"></section>
        </body>
    "#;

    #[test]
    fn creates_modal_and_marks_images_clickable() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        let outcome = setup(&mut page, &ImageModalConfig::default(), &Services::default())?;
        assert_eq!(outcome, Setup::Installed);

        page.assert_exists("body > #imageModal.modal.fade")?;
        page.assert_attr("#imageModal", "tabindex", Some("-1"))?;
        page.assert_text("#imageModal .modal-title", "Imagem")?;
        page.assert_exists(r#"#imageModal .btn-close[data-bs-dismiss="modal"]"#)?;
        page.assert_attr("#campus", "style", Some("cursor: pointer;"))?;
        page.assert_attr("#plain", "style", None)?;
        Ok(())
    }

    #[test]
    fn click_copies_source_and_caption() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        setup(&mut page, &ImageModalConfig::default(), &Services::default())?;

        page.click("#campus")?;
        page.assert_attr(".modal-body img", "src", Some("img/campus.jpg"))?;
        page.assert_attr(".modal-body img", "alt", Some("Campus"))?;
        page.assert_text(".modal-title", "Campus")?;
        page.assert_class("#imageModal", "show", true)?;

        page.click("#lab")?;
        page.assert_attr(".modal-body img", "src", Some("img/lab.jpg"))?;
        page.assert_attr(".modal-body img", "alt", Some(""))?;
        page.assert_text(".modal-title", "Imagem")?;
        Ok(())
    }

    #[test]
    fn existing_modal_is_reused() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        setup(&mut page, &ImageModalConfig::default(), &Services::default())?;
        let again = setup(&mut page, &ImageModalConfig::default(), &Services::default())?;
        assert_eq!(again, Setup::AlreadyPresent);
        assert_eq!(page.count("#imageModal, .modal")?, 1);
        Ok(())
    }
}

use super::*;

/// Adds the collapsible-menu toggle to the navigation bar.
///
/// A toggle already in the markup is left alone, listeners included.
pub(super) fn setup(page: &mut Page, config: &NavMenuConfig) -> Result<Setup> {
    if page.lookup(&config.toggle_selector)?.is_present() {
        return Ok(Setup::AlreadyPresent);
    }

    let navbar_lookup = page.lookup(&config.navbar_selector)?;
    let list_lookup = page.lookup(&config.nav_list_selector)?;
    let (Some(navbar), Some(nav_list)) = (navbar_lookup.node(), list_lookup.node()) else {
        return Ok(Setup::skipped(&navbar_lookup)
            .or_else(|| Setup::skipped(&list_lookup))
            .unwrap_or(Setup::Installed));
    };

    let toggle = page.dom.create_detached_element("button");
    page.dom.set_attr(toggle, "class", &config.toggle_class)?;
    page.dom
        .set_inner_html(toggle, &"<span></span>".repeat(config.bar_count))?;
    page.dom.set_attr(toggle, "aria-label", &config.toggle_label)?;
    page.dom.set_attr(toggle, "aria-expanded", "false")?;
    page.dom.append_child(navbar, toggle)?;

    let active = config.active_class.clone();
    page.on(toggle, "click", move |page, _| {
        let expanded = page.node_attribute(toggle, "aria-expanded").as_deref() == Some("true");
        page.node_set_attribute(toggle, "aria-expanded", if expanded { "false" } else { "true" })?;
        page.dom.class_toggle(toggle, &active)?;
        page.dom.class_toggle(nav_list, &active)?;
        page.trace_behavior_line(format!("[behavior] nav_menu expanded={}", !expanded));
        Ok(())
    });

    for link in page.lookup_all(&config.link_selector)? {
        let active = config.active_class.clone();
        page.on(link, "click", move |page, _| collapse(page, toggle, nav_list, &active));
    }

    Ok(Setup::Installed)
}

fn collapse(page: &mut Page, toggle: NodeId, nav_list: NodeId, active: &str) -> Result<()> {
    page.node_remove_class(toggle, active)?;
    page.node_remove_class(nav_list, active)?;
    page.node_set_attribute(toggle, "aria-expanded", "false")?;
    page.trace_behavior_line("[behavior] nav_menu collapsed".into());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r##"
        <body>
          <nav class="navbar">
            <ul class="nav-list">
              <li class="nav-item"><a id="home" href="#inicio">Início</a></li>
              <li class="nav-item"><a id="contact" href="contato.html">Contato</a></li>
            </ul>
          </nav>
        </body>
    "##;

    #[test]
    fn creates_toggle_with_bars_and_closed_state() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        assert_eq!(setup(&mut page, &NavMenuConfig::default())?, Setup::Installed);

        page.assert_attr(".hamburger", "aria-expanded", Some("false"))?;
        page.assert_attr(".hamburger", "aria-label", Some("Menu de navegação"))?;
        assert_eq!(page.count(".hamburger > span")?, 4);
        page.assert_class(".nav-list", "active", false)?;
        Ok(())
    }

    #[test]
    fn toggle_flips_state_and_links_collapse() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        setup(&mut page, &NavMenuConfig::default())?;

        page.click(".hamburger")?;
        page.assert_attr(".hamburger", "aria-expanded", Some("true"))?;
        page.assert_class(".hamburger", "active", true)?;
        page.assert_class(".nav-list", "active", true)?;

        page.click("#contact")?;
        page.assert_attr(".hamburger", "aria-expanded", Some("false"))?;
        page.assert_class(".hamburger", "active", false)?;
        page.assert_class(".nav-list", "active", false)?;

        // collapsing an already closed menu keeps it closed
        page.click("#home")?;
        page.assert_class(".nav-list", "active", false)?;
        Ok(())
    }

    #[test]
    fn second_setup_adds_nothing() -> Result<()> {
        let mut page = Page::from_html(MARKUP)?;
        setup(&mut page, &NavMenuConfig::default())?;
        assert_eq!(setup(&mut page, &NavMenuConfig::default())?, Setup::AlreadyPresent);
        assert_eq!(page.count(".hamburger")?, 1);

        page.click(".hamburger")?;
        page.assert_attr(".hamburger", "aria-expanded", Some("true"))?;
        Ok(())
    }

    #[test]
    fn missing_nav_list_skips_the_menu() -> Result<()> {
        let mut page = Page::from_html(r#"<body><nav class="navbar"></nav></body>"#)?;
        assert_eq!(
            setup(&mut page, &NavMenuConfig::default())?,
            Setup::Skipped {
                missing: ".nav-list".into()
            }
        );
        page.assert_absent(".hamburger")?;
        Ok(())
    }
}

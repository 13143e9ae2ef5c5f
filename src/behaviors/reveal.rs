use super::*;

/// Fades sections in the first time they scroll into view.
pub(super) fn setup(page: &mut Page, config: &RevealConfig) -> Result<Setup> {
    let sections = page.lookup_all(&config.section_selector)?;
    if sections.is_empty() {
        return Ok(Setup::Skipped {
            missing: config.section_selector.clone(),
        });
    }

    let options = IntersectionOptions {
        threshold: config.threshold,
        root_margin: RootMargin::parse(&config.root_margin)?,
    };
    let reveal_class = config.reveal_class.clone();
    let observer = page.create_intersection_observer(
        options,
        Rc::new(move |page: &mut Page, entries: &[IntersectionEntry]| -> Result<()> {
            for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                if page.node_has_class(entry.target, &reveal_class) {
                    continue;
                }
                page.node_add_class(entry.target, &reveal_class)?;
                let label = page.trace_node_label(entry.target);
                page.trace_behavior_line(format!(
                    "[behavior] reveal target={label} ratio={:.3}",
                    entry.intersection_ratio
                ));
            }
            Ok(())
        }),
    )?;

    for section in sections {
        page.observe(observer, section)?;
    }
    Ok(Setup::Installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <body>
          <section class="epita" id="a"></section>
          <section class="cienc" id="b"></section>
          <section class="constru" id="c"></section>
          <section class="outra" id="d"></section>
        </body>
    "#;

    fn page() -> Result<Page> {
        let mut page = Page::from_html(MARKUP)?;
        page.set_viewport_height(800)?;
        page.set_layout("#a", 100, 400)?;
        page.set_layout("#b", 1500, 400)?;
        page.set_layout("#c", 3000, 400)?;
        page.set_layout("#d", 0, 400)?;
        Ok(page)
    }

    #[test]
    fn sections_in_view_reveal_immediately() -> Result<()> {
        let mut page = page()?;
        assert_eq!(setup(&mut page, &RevealConfig::default())?, Setup::Installed);
        page.assert_class("#a", "animate-fade-in", true)?;
        page.assert_class("#b", "animate-fade-in", false)?;
        page.assert_class("#c", "animate-fade-in", false)?;
        page.assert_class("#d", "animate-fade-in", false)?;
        Ok(())
    }

    #[test]
    fn reveal_is_one_way() -> Result<()> {
        let mut page = page()?;
        setup(&mut page, &RevealConfig::default())?;

        // #b needs 40px visible above the 50px bottom inset:
        // 1500 + 40 = scroll_y + 800 - 50.
        page.scroll_to(789)?;
        page.assert_class("#b", "animate-fade-in", false)?;
        page.scroll_to(790)?;
        page.assert_class("#b", "animate-fade-in", true)?;

        page.scroll_to(0)?;
        page.assert_class("#b", "animate-fade-in", true)?;
        page.assert_class("#c", "animate-fade-in", false)?;
        Ok(())
    }

    #[test]
    fn no_sections_skips_observer() -> Result<()> {
        let mut page = Page::from_html("<body><p>vazio</p></body>")?;
        assert_eq!(
            setup(&mut page, &RevealConfig::default())?,
            Setup::Skipped {
                missing: ".epita, .cienc, .constru".into()
            }
        );
        Ok(())
    }
}

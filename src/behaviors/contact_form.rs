use super::*;

struct ContactForm {
    config: ContactFormConfig,
    form: NodeId,
    email: Option<NodeId>,
    message: Option<NodeId>,
    email_rule: EmailRule,
    message_rule: MessageRule,
    transport: Rc<RefCell<dyn SubmissionTransport>>,
    sending: Cell<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    Message,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Message => "message",
        }
    }
}

/// Inline validation and delayed submission for the contact form.
pub(super) fn setup(
    page: &mut Page,
    config: &ContactFormConfig,
    services: &Services,
) -> Result<Setup> {
    let form_lookup = page.lookup(&config.form_selector)?;
    let Some(form) = form_lookup.node() else {
        return Ok(Setup::skipped(&form_lookup).unwrap_or(Setup::Installed));
    };

    if !page.lookup_within(form, &config.submit_selector)?.is_present() {
        let button = page.dom.create_detached_element("button");
        page.dom.set_attr(button, "type", "submit")?;
        page.dom.set_attr(button, "class", &config.submit_class)?;
        page.dom
            .set_text_content(button, &config.messages.submit_label)?;
        page.dom.append_child(form, button)?;
    }

    let ctx = Rc::new(ContactForm {
        email: page.lookup(&config.email_selector)?.node(),
        message: page.lookup(&config.message_selector)?.node(),
        email_rule: EmailRule::new(&config.email_pattern)?,
        message_rule: MessageRule::new(config.message_min_chars),
        transport: Rc::clone(&services.transport),
        sending: Cell::new(false),
        config: config.clone(),
        form,
    });

    for field in [Field::Email, Field::Message] {
        let Some(node) = ctx.node(field) else {
            continue;
        };
        let on_blur = Rc::clone(&ctx);
        page.on(node, "blur", move |page, _| {
            on_blur.validate(page, field).map(|_| ())
        });
        let on_input = Rc::clone(&ctx);
        page.on(node, "input", move |page, _| {
            if page.node_has_class(node, &on_input.config.invalid_class) {
                on_input.remove_error(page, node)?;
            }
            Ok(())
        });
    }

    let on_submit = Rc::clone(&ctx);
    page.on(form, "submit", move |page, event| {
        event.prevent_default();
        on_submit.submit(page)
    });

    Ok(Setup::Installed)
}

impl ContactForm {
    fn node(&self, field: Field) -> Option<NodeId> {
        match field {
            Field::Email => self.email,
            Field::Message => self.message,
        }
    }

    fn check(&self, field: Field, raw: &str) -> std::result::Result<String, FieldError> {
        match field {
            Field::Email => self.email_rule.check(raw),
            Field::Message => self.message_rule.check(raw),
        }
    }

    fn error_text(&self, field: Field, error: &FieldError) -> &str {
        let messages = &self.config.messages;
        match (field, error) {
            (Field::Email, FieldError::Empty) => &messages.email_empty,
            (Field::Email, _) => &messages.email_malformed,
            (Field::Message, FieldError::Empty) => &messages.message_empty,
            (Field::Message, _) => &messages.message_too_short,
        }
    }

    /// Clears previous markers, then marks the field valid or invalid.
    /// Returns the accepted value; a field missing from the page accepts "".
    fn validate(&self, page: &mut Page, field: Field) -> Result<Option<String>> {
        let Some(node) = self.node(field) else {
            return Ok(Some(String::new()));
        };
        self.remove_error(page, node)?;

        let raw = page.dom.value(node)?;
        match self.check(field, &raw) {
            Ok(value) => {
                page.node_remove_class(node, &self.config.invalid_class)?;
                page.node_add_class(node, &self.config.valid_class)?;
                page.trace_behavior_line(format!(
                    "[behavior] contact_form validate field={} result=valid",
                    field.name()
                ));
                Ok(Some(value))
            }
            Err(error) => {
                let text = self.error_text(field, &error).to_string();
                self.show_error(page, node, &text)?;
                page.trace_behavior_line(format!(
                    "[behavior] contact_form validate field={} result={error}",
                    field.name()
                ));
                Ok(None)
            }
        }
    }

    fn show_error(&self, page: &mut Page, input: NodeId, text: &str) -> Result<()> {
        page.node_add_class(input, &self.config.invalid_class)?;
        page.node_remove_class(input, &self.config.valid_class)?;

        let Some(parent) = page.dom.parent(input) else {
            return Ok(());
        };
        let feedback = match self.feedback_in(page, parent)? {
            Some(existing) => existing,
            None => {
                let created = page.dom.create_detached_element("div");
                page.dom
                    .set_attr(created, "class", &self.config.feedback_class)?;
                page.dom.append_child(parent, created)?;
                created
            }
        };
        page.dom.set_text_content(feedback, text)
    }

    fn remove_error(&self, page: &mut Page, input: NodeId) -> Result<()> {
        page.node_remove_class(input, &self.config.invalid_class)?;
        page.node_remove_class(input, &self.config.valid_class)?;
        if let Some(parent) = page.dom.parent(input) {
            if let Some(feedback) = self.feedback_in(page, parent)? {
                page.node_remove(feedback)?;
            }
        }
        Ok(())
    }

    fn feedback_in(&self, page: &Page, parent: NodeId) -> Result<Option<NodeId>> {
        Ok(page
            .lookup_within(parent, &class_selector(&self.config.feedback_class))?
            .node())
    }

    fn submit(self: &Rc<Self>, page: &mut Page) -> Result<()> {
        if self.sending.get() {
            page.trace_behavior_line("[behavior] contact_form submit ignored=sending".into());
            return Ok(());
        }

        // Both fields are validated so both show their markers.
        let email = self.validate(page, Field::Email)?;
        let message = self.validate(page, Field::Message)?;
        let (Some(email), Some(message)) = (email, message) else {
            page.trace_behavior_line("[behavior] contact_form submit blocked=invalid".into());
            return Ok(());
        };

        let button = page.lookup_within(self.form, &self.config.submit_selector)?.node();
        let original_label = match button {
            Some(button) => {
                let label = page.dom.text_content(button);
                page.dom
                    .set_text_content(button, &self.config.messages.sending_label)?;
                page.dom.set_disabled(button, true)?;
                Some(label)
            }
            None => None,
        };

        self.sending.set(true);
        let latency = self.transport.borrow().latency_ms();
        let submission = Submission { email, message };
        page.trace_behavior_line(format!(
            "[behavior] contact_form sending latency_ms={latency}"
        ));

        let ctx = Rc::clone(self);
        page.set_timeout("contact-form-send", latency, move |page| {
            ctx.finish(page, &submission, button, original_label)
        });
        Ok(())
    }

    fn finish(
        &self,
        page: &mut Page,
        submission: &Submission,
        button: Option<NodeId>,
        original_label: Option<String>,
    ) -> Result<()> {
        self.sending.set(false);
        let outcome = self.transport.borrow_mut().send(submission);
        match outcome {
            Ok(()) => {
                self.show_banner(
                    page,
                    &self.config.success_banner_class,
                    &self.config.messages.success_html,
                )?;
                page.dom.reset_form(self.form)?;
                for node in [self.email, self.message].into_iter().flatten() {
                    self.remove_error(page, node)?;
                }
                page.trace_behavior_line("[behavior] contact_form sent".into());
            }
            Err(failure) => {
                let html = format!(
                    r#"<strong>{}</strong> {} <button type="button" class="btn-close" data-bs-dismiss="alert"></button>"#,
                    escape_text(&self.config.messages.failure_heading),
                    escape_text(&failure.reason),
                );
                self.show_banner(page, &self.config.failure_banner_class, &html)?;
                page.trace_behavior_line(format!(
                    "[behavior] contact_form failed reason={}",
                    failure.reason
                ));
            }
        }

        if let (Some(button), Some(label)) = (button, original_label) {
            page.dom.set_text_content(button, &label)?;
            page.dom.set_disabled(button, false)?;
        }
        Ok(())
    }

    /// Inserts a banner just before the form and removes it once its
    /// lifetime elapses, unless it was dismissed first.
    fn show_banner(&self, page: &mut Page, class_name: &str, html: &str) -> Result<()> {
        let Some(parent) = page.dom.parent(self.form) else {
            return Ok(());
        };
        let banner = page.dom.create_detached_element("div");
        page.dom.set_attr(banner, "class", class_name)?;
        page.dom.set_inner_html(banner, html)?;
        page.dom.insert_before(parent, banner, self.form)?;

        page.set_timeout(
            "contact-form-banner",
            self.config.banner_lifetime_ms,
            move |page| {
                if page.node_is_connected(banner) {
                    page.node_remove(banner)?;
                }
                Ok(())
            },
        );
        Ok(())
    }
}

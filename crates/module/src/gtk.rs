//! GTK3 rendering of the player panel

use crate::art::Artwork;
use crate::executor::{LocalExecutor, LocalTask};
use crate::host::{ButtonHandler, PanelSpec, PanelView, Surface};
use gtk::gdk_pixbuf::{Colorspace, Pixbuf};
use gtk::glib;
use gtk::prelude::*;
use lockplayer_core::{Align, Anchor, ControlButton, LabelField};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::warn;

const PLACEHOLDER_ICON: &str = "audio-x-generic";
const REVEALER_MARGIN: i32 = 5;
const CONTENT_SPACING: i32 = 15;

/// Runs local tasks and timers on the default GLib main context
#[derive(Clone, Copy, Debug, Default)]
pub struct GlibLocal;

impl LocalExecutor for GlibLocal {
    fn spawn(&self, task: LocalTask) {
        glib::MainContext::default().spawn_local(task);
    }

    fn every(&self, period: Duration, mut tick: Box<dyn FnMut() -> ControlFlow<()>>) {
        glib::timeout_add_local(period, move || match tick() {
            ControlFlow::Continue(()) => glib::ControlFlow::Continue,
            ControlFlow::Break(()) => glib::ControlFlow::Break,
        });
    }
}

/// The parts of a lock-screen window a panel can attach to
pub struct GtkSurface {
    pub overlay: gtk::Overlay,
    pub window_box: gtk::Box,
    pub clock_label: gtk::Widget,
}

impl GtkSurface {
    fn attach(&self, revealer: &gtk::Revealer, anchor: Anchor) {
        match anchor {
            Anchor::Overlay { halign, valign } => {
                revealer.set_halign(gtk_align(halign));
                revealer.set_valign(gtk_align(valign));
                self.overlay.add_overlay(revealer);
            }
            Anchor::AboveClock | Anchor::UnderClock => {
                let offset = anchor.clock_offset().unwrap_or(0);
                let clock = self
                    .window_box
                    .children()
                    .iter()
                    .position(|child| *child == self.clock_label)
                    .unwrap_or(0) as i32;
                revealer.set_halign(gtk::Align::Center);
                self.window_box.add(revealer);
                self.window_box.reorder_child(revealer, clock + offset);
            }
        }
    }
}

impl Surface for GtkSurface {
    fn attach_panel(&self, spec: PanelSpec) -> Box<dyn PanelView> {
        let panel = GtkPanel::build(spec.art_size, &spec.on_button);
        self.attach(&panel.revealer, spec.anchor);
        panel.revealer.show_all();
        Box::new(panel)
    }
}

fn gtk_align(align: Align) -> gtk::Align {
    match align {
        Align::Start => gtk::Align::Start,
        Align::Center => gtk::Align::Center,
        Align::End => gtk::Align::End,
    }
}

/// Revealer > hbox(art, labels, buttons)
pub struct GtkPanel {
    revealer: gtk::Revealer,
    art: Option<gtk::Image>,
    art_size: i32,
    label_box: gtk::Box,
    labels: RefCell<BTreeMap<LabelField, gtk::Label>>,
    control_box: gtk::ButtonBox,
    buttons: Vec<(ControlButton, gtk::Button)>,
}

impl GtkPanel {
    fn build(art_size: u32, on_button: &ButtonHandler) -> Self {
        let revealer = gtk::Revealer::new();
        revealer.set_margin_top(REVEALER_MARGIN);
        revealer.set_margin_bottom(REVEALER_MARGIN);
        revealer.set_margin_start(REVEALER_MARGIN);
        revealer.set_margin_end(REVEALER_MARGIN);
        revealer.set_widget_name("player-revealer");
        revealer.set_transition_type(gtk::RevealerTransitionType::None);
        revealer.set_reveal_child(true);

        let content = gtk::Box::new(gtk::Orientation::Horizontal, CONTENT_SPACING);
        revealer.add(&content);

        let art_size = i32::try_from(art_size).unwrap_or(i32::MAX);
        let art = (art_size > 0).then(|| {
            let image = gtk::Image::new();
            image.set_widget_name("album-art");
            image.set_halign(gtk::Align::Center);
            image.set_pixel_size(art_size);
            set_placeholder(&image);
            content.add(&image);
            image
        });

        let label_box = gtk::Box::new(gtk::Orientation::Vertical, 0);
        label_box.set_valign(gtk::Align::Center);
        content.add(&label_box);

        let control_box = gtk::ButtonBox::new(gtk::Orientation::Horizontal);
        control_box.set_valign(gtk::Align::Center);
        control_box.set_layout(gtk::ButtonBoxStyle::Expand);
        content.add(&control_box);

        let mut buttons = Vec::with_capacity(ControlButton::ALL.len());
        for button in ControlButton::ALL {
            let widget =
                gtk::Button::from_icon_name(Some(button.icon_name()), gtk::IconSize::Button);
            let handler = on_button.clone();
            widget.connect_clicked(move |_| handler(button));
            control_box.add(&widget);
            buttons.push((button, widget));
        }

        Self {
            revealer,
            art,
            art_size,
            label_box,
            labels: RefCell::new(BTreeMap::new()),
            control_box,
            buttons,
        }
    }

    fn button(&self, button: ControlButton) -> Option<&gtk::Button> {
        self.buttons
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, widget)| widget)
    }
}

fn set_placeholder(image: &gtk::Image) {
    image.set_from_icon_name(Some(PLACEHOLDER_ICON), gtk::IconSize::Dialog);
}

fn set_label_text(label: &gtk::Label, field: LabelField, text: &str) {
    match field {
        LabelField::Title => {
            label.set_markup(&format!("<b>{}</b>", glib::markup_escape_text(text)));
        }
        LabelField::Album | LabelField::Artist => label.set_text(text),
    }
}

impl PanelView for GtkPanel {
    fn set_art(&self, art: &Artwork) {
        let Some(image) = &self.art else {
            return;
        };
        let (Ok(width), Ok(height)) = (i32::try_from(art.width), i32::try_from(art.height)) else {
            warn!("Album art too large: {:?}", art);
            return;
        };
        let bytes = glib::Bytes::from_owned(art.pixels.clone());
        let pixbuf = Pixbuf::from_bytes(&bytes, Colorspace::Rgb, true, 8, width, height, width * 4);
        image.set_from_pixbuf(Some(&pixbuf));
    }

    fn reset_art(&self) {
        if let Some(image) = &self.art {
            set_placeholder(image);
            image.set_pixel_size(self.art_size);
        }
    }

    fn show_label(&self, field: LabelField, text: &str) {
        let mut labels = self.labels.borrow_mut();
        if let Some(label) = labels.get(&field) {
            set_label_text(label, field, text);
            return;
        }

        let label = gtk::Label::new(None);
        label.set_halign(gtk::Align::Start);
        label.set_widget_name(field.widget_name());
        set_label_text(&label, field, text);

        let position = labels.keys().filter(|f| **f < field).count() as i32;
        self.label_box.add(&label);
        self.label_box.reorder_child(&label, position);
        label.show();
        labels.insert(field, label);
    }

    fn remove_label(&self, field: LabelField) {
        if let Some(label) = self.labels.borrow_mut().remove(&field) {
            self.label_box.remove(&label);
        }
    }

    fn set_play_icon(&self, icon: &str) {
        if let Some(button) = self.button(ControlButton::PlayPause) {
            let image = gtk::Image::from_icon_name(Some(icon), gtk::IconSize::Button);
            button.set_image(Some(&image));
        }
    }

    fn set_button_sensitive(&self, button: ControlButton, sensitive: bool) {
        if let Some(button) = self.button(button) {
            button.set_sensitive(sensitive);
        }
    }

    fn set_controls_visible(&self, visible: bool) {
        self.control_box.set_visible(visible);
    }

    fn set_revealed(&self, revealed: bool) {
        self.revealer.set_reveal_child(revealed);
    }

    fn detach(&self) {
        if let Some(parent) = self.revealer.parent() {
            if let Some(container) = parent.downcast_ref::<gtk::Container>() {
                container.remove(&self.revealer);
            }
        }
    }
}

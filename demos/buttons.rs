//! A window with a column of buttons.
//!
//! Clicking a button relabels it and copies its label to the clipboard.
//! "Quit" closes the window; closing the window any other way asks first by
//! swallowing the first close request.

use std::cell::Cell;

use trellis::layout;
use trellis::widgets::{button, panel};
use trellis::{AddPosition, EventType, Toolkit, WindowOptions};

fn main() -> trellis::Result<()> {
    env_logger::init();

    let mut toolkit = Toolkit::native()?;
    let window = toolkit.open_window(&WindowOptions::new(480, 320).title("trellis buttons"))?;
    let root = window.root();

    let column = panel::new(window);
    window.add_child(root, column, AddPosition::Tail);
    panel::set_layout(window, column, layout::vpack_center);

    for name in ["First", "Second", "Third"] {
        let b = button::new(window, Some(name));
        window.add_child(column, b, AddPosition::Tail);

        let clicks = Cell::new(0u32);
        window.register_handler(b, EventType::ButtonClick, move |win, me, ev| {
            clicks.set(clicks.get() + 1);
            if let Some(m) = ev.mouse() {
                log::info!("{} clicked at {:?} ({} times)", name, m.cursor, clicks.get());
            }
            let text = format!("{} x{}", name, clicks.get());
            win.copy_to_clipboard(&text);
            button::set_label(win, me, &text);
        });
    }

    let quit = button::new(window, Some("Quit"));
    window.add_child(column, quit, AddPosition::Tail);
    window.register_handler(quit, EventType::ButtonClick, |win, _, _| win.run_loop().stop());

    // Veto the first close request only.
    let asked = Cell::new(false);
    window.register_handler(root, EventType::WindowClose, move |win, me, _| {
        if asked.replace(true) {
            win.unregister_handler(me, EventType::WindowClose);
            win.run_loop().stop();
        } else {
            log::info!("close again to quit");
        }
    });

    toolkit.run()
}

//! Output panel: help link and modal, heading, and the plot placeholder that
//! the session fills once a plot has been rendered.

use crate::config::BoxplotConfig;
use crate::error::BoxplotError;
use crate::ui::{ns, AssetLoader, Widget};

pub const PLOT_PLACEHOLDER_ID: &str = "quartilesPlot";
pub const HELP_TRIGGER_ID: &str = "boxplotHelp";
pub const HELP_MODAL_ID: &str = "boxplotHelpModal";

pub fn output_panel(
    namespace: &str,
    assets: &dyn AssetLoader,
    config: &BoxplotConfig,
) -> Result<Widget, BoxplotError> {
    let markdown = assets.load(&config.help_asset)?;
    let modal_id = ns(namespace, HELP_MODAL_ID);

    Ok(Widget::Panel {
        children: vec![
            Widget::HelpTrigger {
                id: ns(namespace, HELP_TRIGGER_ID),
                target: modal_id.clone(),
            },
            Widget::HelpModal {
                id: modal_id,
                title: "Quartile plots".to_string(),
                markdown,
            },
            Widget::Heading {
                level: 3,
                text: "Quartile plots".to_string(),
            },
            Widget::Placeholder {
                id: ns(namespace, PLOT_PLACEHOLDER_ID),
            },
        ],
    })
}

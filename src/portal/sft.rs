//! WebDriver adapter for the SFT portal's file browser.

use std::sync::Arc;

use async_trait::async_trait;

use super::markup::{id_selector, node_label_xpath, parse_listing, parse_tree};
use super::webdriver::{Locator, WebDriverSession};
use super::{FolderEntry, PortalDriver, TreeSnapshot};
use crate::config::{Credentials, PortalConfig};
use crate::error::Result;
use crate::pacing::Pacer;

/// Element id of the folder tree container.
pub const TREE_ROOT_ID: &str = "allFiles_Tree::";

const LISTING_ID: &str = "filelist-grid";
const USER_FIELD: &str = "user";
const PASSWORD_FIELD: &str = "password";
const LOGIN_BUTTON_ID: &str = "loginButon";
const MENU_DOWNLOAD_ID: &str = "allFiles_context::download";
const MENU_DELETE_ID: &str = "allFiles_context::delete";
const CONFIRM_DELETE_ID: &str = "delete_actions::delete";

/// The SFT portal driven through a WebDriver browser session.
///
/// The portal is a script-heavy page with no completion signals, so every
/// interaction is followed by a fixed settle pause.
pub struct SftPortal {
    session: WebDriverSession,
    pacer: Arc<dyn Pacer>,
    config: PortalConfig,
}

impl SftPortal {
    /// Opens a browser session, loads the portal and logs in.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebDriver server is unreachable or the login
    /// form cannot be found.
    pub async fn connect(
        config: PortalConfig,
        credentials: &Credentials,
        download_dir: &std::path::Path,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self> {
        let session =
            WebDriverSession::start(&config.webdriver_url, download_dir, config.headless).await?;
        let portal = Self {
            session,
            pacer,
            config,
        };
        portal.login(credentials).await?;
        Ok(portal)
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        log::info!("Opening {}", self.config.url);
        self.session.navigate(&self.config.url).await?;
        self.pacer.pause(self.config.page_load).await;

        let user = self
            .session
            .find(Locator::Css, &format!("[name=\"{USER_FIELD}\"]"))
            .await?;
        self.session.send_keys(&user, &credentials.username).await?;
        let password = self
            .session
            .find(Locator::Css, &format!("[name=\"{PASSWORD_FIELD}\"]"))
            .await?;
        self.session.send_keys(&password, &credentials.password).await?;

        let button = self.session.find(Locator::Css, &id_selector(LOGIN_BUTTON_ID)).await?;
        self.session.click(&button).await?;
        self.pacer.pause(self.config.page_load).await;
        log::info!("Logged in as {}", credentials.username);
        Ok(())
    }

    async fn click_id(&self, id: &str) -> Result<()> {
        let element = self.session.find(Locator::Css, &id_selector(id)).await?;
        self.session.click(&element).await?;
        self.pacer.pause(self.config.settle).await;
        Ok(())
    }

    async fn outer_html(&self, id: &str) -> Result<String> {
        let element = self.session.find(Locator::Css, &id_selector(id)).await?;
        self.session.property(&element, "outerHTML").await
    }

    async fn context_action(&self, entry_id: &str, menu_id: &str) -> Result<()> {
        let element = self.session.find(Locator::Css, &id_selector(entry_id)).await?;
        self.pacer.pause(self.config.settle).await;
        self.session.context_click(&element).await?;
        self.pacer.pause(self.config.settle).await;
        self.click_id(menu_id).await
    }
}

#[async_trait]
impl PortalDriver for SftPortal {
    async fn tree_snapshot(&self) -> Result<TreeSnapshot> {
        let markup = self.outer_html(TREE_ROOT_ID).await?;
        Ok(parse_tree(&markup, TREE_ROOT_ID))
    }

    async fn expand(&self, node_id: &str) -> Result<()> {
        self.click_id(node_id).await?;
        let element = self.session.find(Locator::Css, &id_selector(node_id)).await?;
        let state = self.session.attribute(&element, "aria-expanded").await?;
        log::debug!("Expanded {node_id} (aria-expanded={})", state.as_deref().unwrap_or("-"));
        Ok(())
    }

    async fn open_folder(&self, node_id: &str) -> Result<()> {
        // The node click reveals the label; the label click lists the contents.
        self.click_id(node_id).await?;
        let label = self
            .session
            .find(Locator::XPath, &node_label_xpath(node_id))
            .await?;
        self.session.click(&label).await?;
        self.pacer.pause(self.config.settle).await;
        Ok(())
    }

    async fn folder_contents(&self) -> Result<Vec<FolderEntry>> {
        let markup = self.outer_html(LISTING_ID).await?;
        self.pacer.pause(self.config.settle).await;
        Ok(parse_listing(&markup))
    }

    async fn download(&self, entry_id: &str) -> Result<()> {
        // Listings render after the folder opens; give them time before lookup.
        self.pacer.pause(self.config.render_wait).await;
        self.context_action(entry_id, MENU_DOWNLOAD_ID).await?;
        self.pacer.pause(self.config.render_wait).await;
        log::info!("Download initiated: {entry_id}");
        Ok(())
    }

    async fn delete(&self, entry_id: &str) -> Result<()> {
        self.context_action(entry_id, MENU_DELETE_ID).await?;
        self.click_id(CONFIRM_DELETE_ID).await?;
        log::info!("Deletion complete: {entry_id}");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.session.quit().await
    }
}

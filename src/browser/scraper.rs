use super::manager::BrowserError;
use super::page::{ElementInfo, Page};
use headless_chrome::protocol::cdp::Page as Cdp;
use headless_chrome::Tab;
use std::path::Path;
use std::sync::Arc;

/// [`Page`] implementation over a live headless Chrome tab
pub struct BrowserScraper {
    tab: Arc<Tab>,
}

impl BrowserScraper {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// Execute JavaScript and return the result as a string
    pub fn evaluate_script(&self, script: &str) -> Result<String, BrowserError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        result
            .value
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .ok_or_else(|| BrowserError::JavaScriptError("Script returned no value".to_string()))
    }

    /// Get a reference to the underlying tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

/// Build the script that serializes every element matching `selector`
fn query_script(selector: &str) -> Result<String, BrowserError> {
    let literal = serde_json::to_string(selector)
        .map_err(|e| BrowserError::InvalidSelector(format!("{}: {}", selector, e)))?;

    Ok(format!(
        r#"(() => {{
            const nodes = Array.from(document.querySelectorAll({literal}));
            return JSON.stringify(nodes.map((e) => {{
                const rect = e.getBoundingClientRect();
                return {{
                    text: e.innerText || e.textContent || "",
                    href: e.getAttribute("href"),
                    src: e.getAttribute("src"),
                    top: rect.top
                }};
            }}));
        }})()"#
    ))
}

impl Page for BrowserScraper {
    fn goto(&self, url: &str) -> Result<(), BrowserError> {
        log::info!("Browser navigating to: {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationError(format!("Navigation timeout for {}: {}", url, e)))?;

        Ok(())
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.tab.get_url())
    }

    fn title(&self) -> Result<String, BrowserError> {
        self.tab
            .get_title()
            .map_err(|e| BrowserError::JavaScriptError(format!("Failed to read title: {}", e)))
    }

    fn body_text(&self) -> Result<String, BrowserError> {
        self.evaluate_script("document.body ? document.body.innerText : ''")
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, BrowserError> {
        let json = self
            .evaluate_script(&query_script(selector)?)
            .map_err(|e| BrowserError::InvalidSelector(format!("{}: {}", selector, e)))?;

        serde_json::from_str(&json)
            .map_err(|e| BrowserError::JavaScriptError(format!("Unreadable query result: {}", e)))
    }

    fn click(&self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let elements = self
            .tab
            .find_elements(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;

        let element = elements
            .get(index)
            .ok_or_else(|| BrowserError::ElementNotFound(format!("{} [{}]", selector, index)))?;

        element
            .click()
            .map_err(|e| BrowserError::InputError(format!("Click on {} failed: {}", selector, e)))?;

        Ok(())
    }

    fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;

        element
            .type_into(value)
            .map_err(|e| BrowserError::InputError(format!("Typing into {} failed: {}", selector, e)))?;

        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.tab
            .press_key(key)
            .map_err(|e| BrowserError::InputError(format!("Key {} failed: {}", key, e)))?;

        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.tab
            .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
            .map_err(|e| BrowserError::JavaScriptError(format!("Scroll failed: {}", e)))?;

        Ok(())
    }

    fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        let screenshot_data = self
            .tab
            .capture_screenshot(Cdp::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| BrowserError::ScreenshotError(e.to_string()))?;

        std::fs::write(path, screenshot_data)
            .map_err(|e| BrowserError::ScreenshotError(format!("Failed to save {}: {}", path.display(), e)))?;

        log::info!("Screenshot saved to: {}", path.display());
        Ok(())
    }
}

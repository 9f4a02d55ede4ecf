//! In-page scripts evaluated by the Chromium driver.
//!
//! Selectors and binding names are embedded as JSON string literals so any
//! quoting inside a selector survives.

fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Clicks the first match; evaluates to `false` when nothing matches.
pub fn click_element(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) {{ return false; }} el.click(); return true; }})()",
        sel = js_str(selector)
    )
}

pub fn query_all_text(selector: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({sel}), (node) => node.innerText ?? '')",
        sel = js_str(selector)
    )
}

/// Installs a MutationObserver on `root` that forwards the record count of each
/// callback to `binding`. Evaluates to `false` when `root` does not match.
pub fn install_observer(binding: &str, root: &str) -> String {
    format!(
        r#"(() => {{
  const root = document.querySelector({root});
  if (!root) {{ return false; }}
  const notify = window[{binding}];
  const observer = new MutationObserver((records) => notify(String(records.length)));
  observer.observe(root, {{ attributes: true, childList: true, subtree: true }});
  window.__boardMigratorObservers = window.__boardMigratorObservers || {{}};
  window.__boardMigratorObservers[{binding}] = observer;
  return true;
}})()"#,
        root = js_str(root),
        binding = js_str(binding)
    )
}

pub fn disconnect_observer(binding: &str) -> String {
    format!(
        r#"(() => {{
  const observers = window.__boardMigratorObservers || {{}};
  const observer = observers[{binding}];
  if (observer) {{ observer.disconnect(); delete observers[{binding}]; }}
  return Boolean(observer);
}})()"#,
        binding = js_str(binding)
    )
}

//! Contract tests for [`ChromiumDriver`] against a real Chromium binary.
//! Ignored by default; set `BOARD_MIGRATOR_CDP_CONTRACT=1` to run them.

use std::env;
use std::time::Duration;

use cdp_adapter::{AdapterErrorKind, CdpConfig, ChromiumDriver, UiDriver, WaitUntil};
use futures::StreamExt;
use tokio::time::timeout;

const PAGE: &str = "data:text/html,<html><body>\
<ul id='cards'><li class='card'>Buy milk</li><li class='card'>Call Bob</li></ul>\
<input id='field'/>\
<button id='add' onclick=\"var li=document.createElement('li');li.className='card';\
li.textContent=document.getElementById('field').value;document.getElementById('cards').appendChild(li)\">Add</button>\
</body></html>";

/// Login form whose submit only goes out after a delay, like a script-driven sign-in.
const LOGIN_PAGE: &str = "data:text/html,<html><body>\
<form id='login' action='about:blank' method='get'><input id='email' name='email'/>\
<button id='submit' type='button' onclick=\"setTimeout(function(){document.getElementById('login').submit()},300)\">Sign in</button>\
</form></body></html>";

fn contract_enabled() -> bool {
    env::var("BOARD_MIGRATOR_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

async fn launch() -> ChromiumDriver {
    let cfg = CdpConfig {
        no_sandbox: true,
        ..CdpConfig::default()
    };
    ChromiumDriver::launch(&cfg).await.expect("browser launch")
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set BOARD_MIGRATOR_CDP_CONTRACT=1"]
async fn contract_type_click_and_query() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (BOARD_MIGRATOR_CDP_CONTRACT not enabled)");
        return;
    }

    let driver = launch().await;
    driver
        .navigate(PAGE, WaitUntil::DomContentLoaded)
        .await
        .expect("navigate");
    driver.type_text("#field", "Fix roof").await.expect("type");

    let mut watch = driver.observe_mutations("#cards").await.expect("observe");
    driver.click("#add").await.expect("click");
    let notice = timeout(Duration::from_secs(5), watch.next())
        .await
        .expect("mutation notice in time");
    assert!(notice.is_some());
    drop(watch);

    let texts = driver.query_all_text("li.card").await.expect("query");
    assert_eq!(texts, vec!["Buy milk", "Call Bob", "Fix roof"]);

    driver.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set BOARD_MIGRATOR_CDP_CONTRACT=1"]
async fn contract_missing_element_is_reported() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (BOARD_MIGRATOR_CDP_CONTRACT not enabled)");
        return;
    }

    let driver = launch().await;
    driver
        .navigate(PAGE, WaitUntil::Load)
        .await
        .expect("navigate");

    let err = driver.click("#absent").await.unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::ElementNotFound);

    let err = driver.type_text("#absent", "text").await.unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::ElementNotFound);

    let err = driver.observe_mutations("#absent").await.unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::ElementNotFound);

    driver.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set BOARD_MIGRATOR_CDP_CONTRACT=1"]
async fn contract_waits_for_navigation_started_by_click() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (BOARD_MIGRATOR_CDP_CONTRACT not enabled)");
        return;
    }

    let driver = launch().await;
    driver
        .navigate(LOGIN_PAGE, WaitUntil::Load)
        .await
        .expect("navigate");
    driver.type_text("#email", "me@example.com").await.expect("type");
    driver.click("#submit").await.expect("click");

    // The login form is still present until the delayed submit navigates away.
    assert_eq!(driver.query_all_text("#login").await.expect("query").len(), 1);

    driver.wait_for_navigation().await.expect("navigation");
    let forms = driver.query_all_text("#login").await.expect("query");
    assert!(forms.is_empty(), "still on the login document");

    driver.close().await.expect("close");
}

//! Server-rendered HTML for the login, signup and article pages.

use core_guard::CSRF_FORM_FIELD;

pub fn login_page(login_path: &str, failed: bool, next: Option<&str>, csrf_token: &str) -> String {
    let banner = if failed {
        r#"<p class="alert error">Invalid username or password.</p>"#
    } else {
        ""
    };
    let next_field = next
        .map(|n| format!(r#"<input type="hidden" name="next" value="{}">"#, escape_html(n)))
        .unwrap_or_default();

    layout(
        "Log in",
        &format!(
            r#"<h1>Log in</h1>
{banner}
<form method="post" action="{action}">
  <label>Email <input type="text" name="username" autocomplete="username" required></label>
  <label>Password <input type="password" name="password" autocomplete="current-password" required></label>
  {next_field}
  {csrf}
  <button type="submit">Log in</button>
</form>
<p><a href="/signup">Create an account</a></p>"#,
            banner = banner,
            action = escape_html(login_path),
            next_field = next_field,
            csrf = csrf_field(csrf_token),
        ),
    )
}

pub fn signup_page(failed: bool, csrf_token: &str) -> String {
    let banner = if failed {
        r#"<p class="alert error">That username is taken or the details are invalid.</p>"#
    } else {
        ""
    };

    layout(
        "Sign up",
        &format!(
            r#"<h1>Sign up</h1>
{banner}
<form method="post" action="/user">
  <label>Email <input type="text" name="username" autocomplete="username" required></label>
  <label>Password <input type="password" name="password" autocomplete="new-password" maxlength="72" required></label>
  {csrf}
  <button type="submit">Sign up</button>
</form>
<p><a href="/login">Already registered? Log in</a></p>"#,
            banner = banner,
            csrf = csrf_field(csrf_token),
        ),
    )
}

pub fn articles_page(username: &str, logout_path: &str, csrf_token: &str) -> String {
    layout(
        "Articles",
        &format!(
            r#"<h1>Articles</h1>
<p>Signed in as <strong>{user}</strong>.</p>
<form method="post" action="{logout}">
  {csrf}
  <button type="submit">Log out</button>
</form>"#,
            user = escape_html(username),
            logout = escape_html(logout_path),
            csrf = csrf_field(csrf_token),
        ),
    )
}

fn csrf_field(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        CSRF_FORM_FIELD,
        escape_html(token)
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="/static/css/site.css">
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        body = body,
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

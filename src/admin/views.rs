//! Server-rendered HTML for the admin pages.

use std::fmt::Write;

use crate::{error::FieldErrors, users::repo_types::User};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, staff: Option<&User>, body: &str) -> String {
    let header = match staff {
        Some(u) => format!(
            r#"<div id="user-tools">Welcome, <strong>{}</strong>.
<form method="post" action="/admin/logout"><button type="submit">Log out</button></form></div>"#,
            escape(&u.email)
        ),
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} | Site administration</title></head>
<body>
<div id="header"><h1><a href="/admin/users">Site administration</a></h1>{header}</div>
<div id="content"><h2>{title}</h2>
{body}
</div>
</body>
</html>"#,
        title = escape(title),
    )
}

fn error_list(errors: &FieldErrors, field: &str) -> String {
    match errors.get(field) {
        Some(messages) if !messages.is_empty() => {
            let mut out = String::from(r#"<ul class="errorlist">"#);
            for m in messages {
                let _ = write!(out, "<li>{}</li>", escape(m));
            }
            out.push_str("</ul>");
            out
        }
        _ => String::new(),
    }
}

fn checkbox(name: &str, label: &str, checked: bool) -> String {
    format!(
        r#"<p><label><input type="checkbox" name="{name}"{}> {label}</label></p>"#,
        if checked { " checked" } else { "" }
    )
}

pub fn login_page(email: &str, next: &str, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="errornote">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"{error}<form method="post" action="/admin/login">
<input type="hidden" name="next" value="{next}">
<p><label>Email: <input type="email" name="email" value="{email}" required></label></p>
<p><label>Password: <input type="password" name="password" required></label></p>
<p><button type="submit">Log in</button></p>
</form>"#,
        next = escape(next),
        email = escape(email),
    );
    layout("Log in", None, &body)
}

pub fn user_list(users: &[User], staff: &User) -> String {
    let mut rows = String::new();
    for u in users {
        let _ = write!(
            rows,
            r#"<tr><td><a href="/admin/users/{id}/change">{email}</a></td><td>{name}</td><td>{staff}</td><td>{active}</td></tr>
"#,
            id = u.id,
            email = escape(&u.email),
            name = escape(&u.name),
            staff = if u.is_staff { "yes" } else { "no" },
            active = if u.is_active { "yes" } else { "no" },
        );
    }
    let body = format!(
        r#"<p><a href="/admin/users/add">Add user</a></p>
<table id="result_list">
<thead><tr><th>Email</th><th>Name</th><th>Staff status</th><th>Active</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
<p>{count} user{plural}</p>"#,
        count = users.len(),
        plural = if users.len() == 1 { "" } else { "s" },
    );
    layout("Select user to change", Some(staff), &body)
}

pub fn user_add(staff: &User, email: &str, name: &str, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<form method="post" action="/admin/users/add">
{email_errors}<p><label>Email: <input type="email" name="email" value="{email}" required></label></p>
{name_errors}<p><label>Name: <input type="text" name="name" value="{name}"></label></p>
{password1_errors}<p><label>Password: <input type="password" name="password1" required></label></p>
{password2_errors}<p><label>Password confirmation: <input type="password" name="password2" required></label></p>
<p><button type="submit">Save</button></p>
</form>"#,
        email_errors = error_list(errors, "email"),
        name_errors = error_list(errors, "name"),
        password1_errors = error_list(errors, "password1"),
        password2_errors = error_list(errors, "password2"),
        email = escape(email),
        name = escape(name),
    );
    layout("Add user", Some(staff), &body)
}

/// Edit form; `form` carries the values to show, which differ from the stored
/// user after a rejected submission.
pub fn user_change(staff: &User, form: &User, errors: &FieldErrors) -> String {
    let password = if form.has_usable_password() {
        "Raw passwords are not stored."
    } else {
        "No password set."
    };
    let last_login = form
        .last_login
        .map(|t| t.to_string())
        .unwrap_or_else(|| "never".to_string());
    let body = format!(
        r#"<form method="post" action="/admin/users/{id}/change">
{email_errors}<p><label>Email: <input type="email" name="email" value="{email}" required></label></p>
<p>Password: {password} <a href="/admin/users/{id}/password">Change password</a></p>
{name_errors}<p><label>Name: <input type="text" name="name" value="{name}"></label></p>
{active}{is_staff}{is_superuser}<p>Last login: {last_login}</p>
<p>Date joined: {joined}</p>
<p><button type="submit">Save</button></p>
</form>"#,
        id = form.id,
        email_errors = error_list(errors, "email"),
        name_errors = error_list(errors, "name"),
        email = escape(&form.email),
        name = escape(&form.name),
        active = checkbox("is_active", "Active", form.is_active),
        is_staff = checkbox("is_staff", "Staff status", form.is_staff),
        is_superuser = checkbox("is_superuser", "Superuser status", form.is_superuser),
        joined = form.created_at,
    );
    layout("Change user", Some(staff), &body)
}

pub fn password_change(staff: &User, target: &User, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<p>Enter a new password for the user <strong>{email}</strong>.</p>
<form method="post" action="/admin/users/{id}/password">
{password1_errors}<p><label>Password: <input type="password" name="password1" required></label></p>
{password2_errors}<p><label>Password (again): <input type="password" name="password2" required></label></p>
<p><button type="submit">Change password</button></p>
</form>"#,
        email = escape(&target.email),
        id = target.id,
        password1_errors = error_list(errors, "password1"),
        password2_errors = error_list(errors, "password2"),
    );
    layout("Change password", Some(staff), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn login_page_keeps_next_and_error() {
        let html = login_page("a@b.com", "/admin/users/add", Some("bad <login>"));
        assert!(html.contains(r#"value="/admin/users/add""#));
        assert!(html.contains("bad &lt;login&gt;"));
    }

    #[test]
    fn field_errors_render_as_list() {
        let errors = FieldErrors::single("email", "Enter a valid email address.");
        let html = error_list(&errors, "email");
        assert!(html.contains("<li>Enter a valid email address.</li>"));
        assert!(error_list(&errors, "name").is_empty());
    }
}

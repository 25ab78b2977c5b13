use crate::auth::MIN_PASSWORD_LEN;
use crate::ui::View;

pub fn login() -> View {
    View::new(
        "Login",
        r##"<section class="auth"><h1>Log in</h1>
<form data-action="login">
  <label>Username or email <input name="identifier" required></label>
  <label>Password <input name="password" type="password" required></label>
  <button>Log in</button>
</form>
<p>No account yet? <a href="#/register">Register</a></p></section>"##,
    )
}

pub fn register() -> View {
    View::new(
        "Register",
        format!(
            r##"<section class="auth"><h1>Create an account</h1>
<form data-action="register">
  <label>First name <input name="firstName" required></label>
  <label>Last name <input name="lastName" required></label>
  <label>Username <input name="username" required></label>
  <label>Email <input name="email" type="email" required></label>
  <label>Password <input name="password" type="password" minlength="{MIN_PASSWORD_LEN}" required></label>
  <label>Confirm password <input name="confirmPassword" type="password" required></label>
  <button>Register</button>
</form>
<p>Already registered? <a href="#/login">Log in</a></p></section>"##
        ),
    )
}

use crate::api::auth::validate_signup;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardHeader, CardTitle, Input, Label, Spinner,
};
use crate::editor::{EditableImage, EditableText, SectionStyle};
use crate::state::AppContext;
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
fn SiteHeader() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let edit_mode = app_state.0.edit_mode;

    view! {
        <header class="border-b border-border bg-background">
            <div class="mx-auto flex max-w-5xl items-center justify-between px-4 py-3">
                <a href="/" class="flex items-center gap-2">
                    <EditableImage
                        id="site.logo"
                        default_src="/logo.svg"
                        alt="Centre logo"
                        class="h-10 w-auto"
                    />
                </a>
                <nav class="flex items-center gap-3 text-xs text-muted-foreground">
                    <Show when=move || edit_mode.get()>
                        <span class="rounded bg-accent px-2 py-0.5 text-accent-foreground">"Editing"</span>
                    </Show>
                    <a href="/admin/settings" class="hover:text-foreground">"Admin"</a>
                </nav>
            </div>
        </header>
    }
}

#[component]
fn Blurb(
    #[prop(into)] id: &'static str,
    #[prop(into)] title: &'static str,
    #[prop(into)] body: &'static str,
) -> impl IntoView {
    view! {
        <SectionStyle id=format!("{id}.section") class="rounded-xl border border-border p-5">
            <EditableText id=format!("{id}.title") default=title class="text-lg font-semibold" />
            <EditableText id=format!("{id}.body") default=body class="mt-2 text-sm leading-relaxed" />
        </SectionStyle>
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="min-h-screen bg-background text-foreground">
            <SiteHeader />
            <main class="mx-auto flex max-w-5xl flex-col gap-8 px-4 py-10">
                <SectionStyle id="home.hero" class="rounded-2xl px-6 py-14 text-center">
                    <EditableText
                        id="home.hero.title.primary"
                        default="Welcome to the Centre"
                        class="text-4xl font-bold tracking-tight"
                    />
                    <EditableText
                        id="home.hero.subtitle"
                        default="A place to pray, read and meet."
                        class="mt-3 text-base text-muted-foreground"
                    />
                </SectionStyle>

                <div class="grid gap-4 md:grid-cols-3">
                    <Blurb
                        id="home.chapel"
                        title="Chapel"
                        body="Open every day for quiet prayer. Services are listed at the entrance."
                    />
                    <Blurb
                        id="home.library"
                        title="Library"
                        body="Thousands of titles to borrow, with reading rooms on the first floor."
                    />
                    <Blurb
                        id="home.bookshop"
                        title="Bookshop"
                        body="New and second-hand books, cards and gifts."
                    />
                </div>

                <SectionStyle id="home.visit" class="rounded-xl border border-border p-6">
                    <EditableText id="home.visit.title" default="Visit us" class="text-xl font-semibold" />
                    <EditableText
                        id="home.visit.body"
                        default="Monday to Saturday, <strong>9am to 5pm</strong>."
                        class="mt-2 text-sm"
                    />
                </SectionStyle>
            </main>
        </div>
    }
}

#[component]
fn ErrorAlert(error: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || error.get().is_some() fallback=|| ().into_view()>
            {move || {
                error.get().map(|e| {
                    view! {
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                        </Alert>
                    }
                })
            }}
        </Show>
    }
}

#[component]
fn SignInCard() -> impl IntoView {
    let email: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let confirm_password: RwSignal<String> = RwSignal::new(String::new());
    let signing_up: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();
    let state = StoredValue::new(app_state.0.clone());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let email_val = email.get().trim().to_string();
        let password_val = password.get();
        let sign_up = signing_up.get();

        if sign_up {
            if let Err(e) = validate_signup(&email_val, &password_val, &confirm_password.get()) {
                error.set(Some(e.message));
                return;
            }
        }

        loading.set(true);
        error.set(None);
        notice.set(None);

        let state = state.get_value();
        spawn_local(async move {
            let result = if sign_up {
                state.auth.sign_up(&email_val, &password_val, now_ms()).await
            } else {
                state
                    .auth
                    .sign_in(&email_val, &password_val, now_ms())
                    .await
                    .map(Some)
            };
            match result {
                Ok(Some(session)) => state.sign_in(session),
                Ok(None) => {
                    notice.set(Some("Check your inbox to confirm the account, then sign in.".to_string()));
                    signing_up.set(false);
                }
                Err(e) => {
                    tracing::warn!(error = %e, kind = %e.kind, "authentication failed");
                    error.set(Some(e.message));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">
                    {move || if signing_up.get() { "Create editor account" } else { "Sign in" }}
                </CardTitle>
                <CardDescription class="text-xs">"Editors can change page content in place."</CardDescription>
            </CardHeader>

            <CardContent>
                <form class="flex flex-col gap-3" on:submit=on_submit>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="email" class="text-xs">"Email"</Label>
                        <Input
                            id="email"
                            r#type="email"
                            placeholder="you@example.com"
                            bind_value=email
                            required=true
                            class="h-8 text-sm"
                        />
                    </div>

                    <div class="flex flex-col gap-1.5">
                        <Label html_for="password" class="text-xs">"Password"</Label>
                        <Input
                            id="password"
                            r#type="password"
                            placeholder="••••••••"
                            bind_value=password
                            required=true
                            class="h-8 text-sm"
                        />
                    </div>

                    <Show when=move || signing_up.get() fallback=|| ().into_view()>
                        <div class="flex flex-col gap-1.5">
                            <Label html_for="confirm_password" class="text-xs">"Confirm password"</Label>
                            <Input
                                id="confirm_password"
                                r#type="password"
                                placeholder="••••••••"
                                bind_value=confirm_password
                                class="h-8 text-sm"
                            />
                        </div>
                    </Show>

                    <ErrorAlert error=error />
                    <Show when=move || notice.get().is_some() fallback=|| ().into_view()>
                        <p class="text-xs text-muted-foreground">{move || notice.get().unwrap_or_default()}</p>
                    </Show>

                    <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                        <span class="inline-flex items-center gap-2">
                            <Show when=move || loading.get() fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            {move || match (loading.get(), signing_up.get()) {
                                (true, _) => "Please wait...",
                                (false, true) => "Create account",
                                (false, false) => "Continue",
                            }}
                        </span>
                    </Button>

                    <button
                        type="button"
                        class="pt-1 text-left text-xs text-primary underline underline-offset-4"
                        on:click=move |_| {
                            signing_up.update(|v| *v = !*v);
                            error.set(None);
                        }
                    >
                        {move || if signing_up.get() { "Have an account? Sign in" } else { "No account? Sign up" }}
                    </button>
                </form>
            </CardContent>
        </Card>
    }
}

#[component]
fn EditorControls() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = app_state.0.session;
    let edit_mode = app_state.0.edit_mode;
    let state = StoredValue::new(app_state.0.clone());
    let cleared: RwSignal<Option<usize>> = RwSignal::new(None);

    let on_toggle = move |_| {
        state.with_value(|s| s.set_edit_mode(!edit_mode.get_untracked()));
    };

    let on_clear = move |_| {
        let removed = state.with_value(|s| s.store.clear_local_content());
        cleared.set(Some(removed));
    };

    let on_sign_out = move |_| {
        state.with_value(|s| s.sign_out());
        cleared.set(None);
    };

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Editing"</CardTitle>
                <CardDescription class="text-xs">
                    {move || {
                        session
                            .get()
                            .map(|s| format!("Signed in as {}", s.email))
                            .unwrap_or_default()
                    }}
                </CardDescription>
            </CardHeader>

            <CardContent>
                <div class="flex flex-col gap-4">
                    <div class="flex items-center justify-between gap-3">
                        <div class="text-sm">
                            <div class="font-medium">"Edit mode"</div>
                            <div class="text-xs text-muted-foreground">
                                "Shows editing controls on every page."
                            </div>
                        </div>
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=on_toggle>
                            {move || if edit_mode.get() { "Turn off" } else { "Turn on" }}
                        </Button>
                    </div>

                    <div class="flex items-center justify-between gap-3">
                        <div class="text-sm">
                            <div class="font-medium">"Clear Local Content"</div>
                            <div class="text-xs text-muted-foreground">
                                "Removes cached edits from this browser only."
                            </div>
                        </div>
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Destructive on:click=on_clear>
                            "Clear Local Content"
                        </Button>
                    </div>
                    <Show when=move || cleared.get().is_some() fallback=|| ().into_view()>
                        <p class="text-xs text-muted-foreground">
                            {move || {
                                let n = cleared.get().unwrap_or_default();
                                let noun = if n == 1 { "entry" } else { "entries" };
                                format!("Removed {n} local {noun}.")
                            }}
                        </p>
                    </Show>

                    <div class="flex items-center gap-2 border-t border-border pt-4">
                        <a href="/" class="text-xs text-primary underline underline-offset-4">"Back to site"</a>
                        <div class="flex-1"></div>
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=on_sign_out>
                            "Sign out"
                        </Button>
                    </div>
                </div>
            </CardContent>
        </Card>
    }
}

#[component]
pub fn AdminSettingsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = app_state.0.session;

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <a href="/" class="text-sm font-medium text-foreground">"Site settings"</a>
                </div>
                <Show when=move || session.get().is_some() fallback=|| view! { <SignInCard /> }>
                    <EditorControls />
                </Show>
            </div>
        </div>
    }
}

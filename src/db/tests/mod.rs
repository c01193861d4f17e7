mod groups;
mod migrations;
mod parts;
